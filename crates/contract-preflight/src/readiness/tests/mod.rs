mod addons;
mod common;
mod schedule;
