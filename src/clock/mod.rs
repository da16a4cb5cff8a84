//! Clock arithmetic
//!
//! This module contains the pure, side-effect free pieces of the game:
//! clock times and their generation, distractors for multiple choice
//! rounds, and the scoring of a single guess.

pub mod distractors;
pub mod scoring;
pub mod time;
