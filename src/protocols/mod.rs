pub mod helpers;

pub mod a2s;
