// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! Properties of the decision function over the whole flag space.

mod credential_naming;
mod flag_combinations;
