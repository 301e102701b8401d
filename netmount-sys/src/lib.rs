// SPDX-License-Identifier: GPL-3.0-only

//! Low-level system operations for the mount supervisor
//!
//! This crate wraps everything that touches the operating system directly:
//! - RClone CLI operations (mount, obscure, connectivity probe)
//! - The named-section rclone configuration file
//! - Detached child process spawning and termination
//! - Probing whether encrypted user storage is unlocked
//!
//! Higher layers talk to rclone only through [`MountExecutor`], so the
//! supervisor can be exercised against a fake executor.

pub mod error;
pub mod executor;
pub mod process;
pub mod rclone;
pub mod unlock;

pub use error::{Result, SysError};
pub use executor::MountExecutor;
pub use process::{ExitReport, OutputStream, SpawnedMount};
pub use rclone::invocation::{MountDefaults, MountInvocation};
pub use rclone::sections::SectionFile;
pub use rclone::RCloneCli;
pub use unlock::{FsProbe, StorageProbe, UnlockGate};
