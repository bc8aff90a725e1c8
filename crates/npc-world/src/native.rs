//! Well-known native behavior ids.
//!
//! Each [`Navigation`][crate::Navigation] order starts exactly one of these on
//! the host.  The pursuit core queries them to avoid re-issuing an order the
//! host is still executing and to notice when one has silently finished.

use npc_core::NativeTaskId;

pub const GO_TO:         NativeTaskId = NativeTaskId(1);
pub const FOLLOW:        NativeTaskId = NativeTaskId(2);
pub const ENTER_VEHICLE: NativeTaskId = NativeTaskId(3);
pub const LEAVE_VEHICLE: NativeTaskId = NativeTaskId(4);
pub const WANDER:        NativeTaskId = NativeTaskId(5);
pub const HOLD_POSITION: NativeTaskId = NativeTaskId(6);
pub const AIM:           NativeTaskId = NativeTaskId(7);
pub const COMBAT:        NativeTaskId = NativeTaskId(8);
pub const TASER:         NativeTaskId = NativeTaskId(9);
pub const CUFF:          NativeTaskId = NativeTaskId(10);
pub const DRAG_OUT:      NativeTaskId = NativeTaskId(11);
