// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub mod broker;
pub mod checkout;
pub mod config;
pub mod error;
pub mod exec;
pub mod resolve;
pub mod revision;
pub mod run;
pub mod test_support;
