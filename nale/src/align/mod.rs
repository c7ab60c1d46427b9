pub mod bounded;
pub mod needleman_wunsch;
