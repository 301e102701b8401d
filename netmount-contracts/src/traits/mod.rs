// SPDX-License-Identifier: GPL-3.0-only

pub mod facade;

pub use facade::MountFacade;
