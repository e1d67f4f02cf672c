mod basic;
mod devices;
mod records;
mod sync;
