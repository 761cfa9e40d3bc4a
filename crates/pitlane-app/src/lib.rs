// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod ids;
pub mod modals;
pub mod model;
pub mod notify;
pub mod radar;
pub mod reminders;
pub mod store;
pub mod validate;

pub use ids::*;
pub use modals::*;
pub use model::*;
pub use notify::*;
pub use radar::*;
pub use reminders::*;
pub use store::*;
pub use validate::*;
