//! Evidentia HTTP server library (router, handlers, adapter wiring).

pub mod gateway;
