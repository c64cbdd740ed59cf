pub mod bridge;
pub mod controller;
pub mod door;
pub mod event;
pub mod level;
pub mod registry;
pub mod schedule;
pub mod step;
pub mod world;
