//! Tick-driven cooperative task scheduler for the ATmega128
//!
//! A timer interrupt calls [`rtos::Scheduler::tick`]; the main loop calls
//! [`rtos::Scheduler::dispatch`]. Pending deadlines are kept in a delta
//! queue threaded through a fixed table of [`config::MAX_TASKS`] slots, so
//! nothing is allocated and the interrupt side does constant work per tick.
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod logger;

pub mod config;
pub mod drivers;
pub mod hal;
pub mod rtos;
