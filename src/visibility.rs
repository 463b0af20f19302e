use crate::report::{Report, UserId};

/// Public reports are readable by anyone; private ones only by their owner.
/// An anonymous requester (`None`) sees public reports only.
pub fn can_read(report: &Report, requester: Option<UserId>) -> bool {
    report.is_public || requester == Some(report.owner_id)
}
