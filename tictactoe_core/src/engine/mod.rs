pub mod bot;

pub use bot::choose_move;
