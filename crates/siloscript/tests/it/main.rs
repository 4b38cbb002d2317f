mod control;
mod data;
mod public;
mod support;
