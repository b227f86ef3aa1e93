//==============================================
// File: tests/mod.rs
//==============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: KrScript in-crate test suite
// Objective: Group behavioral tests for values, control flow, functions,
//            enums, classes, and the source printer
//==============================================

pub mod classes;
pub mod control_flow;
pub mod enums;
pub mod functions;
pub mod printer;

//==============================================
// End of file
//==============================================
