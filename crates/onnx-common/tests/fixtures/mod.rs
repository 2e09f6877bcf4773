#![allow(dead_code)]

pub mod counting_runtime;
