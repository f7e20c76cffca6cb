// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP protocol for the HTTP File Server
//!
//! | Method   | Operation         | Success                      | Failure        |
//! |----------|-------------------|------------------------------|----------------|
//! | `GET`    | read              | `200` + content              | `404`, `500`   |
//! | `POST`   | create-or-replace | `201` created, `200` replaced | `500`          |
//! | `DELETE` | remove            | `204`                        | `404`, `500`   |
//!
//! Any other method is answered with `405`.

pub mod client;
pub mod server;

pub use client::{FileServerClient, RemoteFile};
pub use server::FileServer;
