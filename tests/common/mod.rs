#![allow(dead_code)]

pub mod archives;
pub mod fixtures;
pub mod vectors;
