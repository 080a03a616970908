// Topic Tabs - Topic-scoped browser tab visibility engine
// Copyright (C) 2025  Simon Peter Rothgang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Visibility switch engine: makes one topic the single visible topic.

mod empty_topic;
mod switch;
mod verify;
pub mod visibility;

pub use empty_topic::EmptyTopicOutcome;
pub(crate) use switch::record_of;
pub use switch::{SwitchPhase, SwitchReport, switch_to_topic};
pub use verify::{VerifyReport, VisibilityMismatch, verify_visibility};
pub use visibility::{Primitive, StepOutcome};
