pub mod backend;
pub mod cell;
pub mod event;
pub mod output;
pub mod raw_seq;
pub mod redraw;
pub mod style;
