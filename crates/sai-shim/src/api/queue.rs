//! Queue API.
//!
//! Queues are not allocated; their handles are computed. The map field
//! carries the port, the subtype the [`QueueType`] and the value the queue
//! index within that port.

use crate::attr::{attr_ids, check_get_list, Attribute, AttributeValue};
use crate::error::{SaiError, SaiResult};
use crate::handle::{Handle, ObjectType, QueueType};
use crate::logging::SaiApi;
use crate::sdk::{QueueSelector, SwitchSdk};
use crate::switch::{SaiSwitch, SwitchContext};

use super::scheduler::{bind_scheduler, SchedulerTarget};

attr_ids! {
    pub enum QueueAttr {
        Type => "SAI_QUEUE_ATTR_TYPE",
        WredProfileId => "SAI_QUEUE_ATTR_WRED_PROFILE_ID",
        BufferProfileId => "SAI_QUEUE_ATTR_BUFFER_PROFILE_ID",
        SchedulerProfileId => "SAI_QUEUE_ATTR_SCHEDULER_PROFILE_ID",
    }
}

/// Handle of queue `index` of `port`. The port must fit the 16-bit map
/// field.
pub fn queue_handle(port: u32, queue_type: QueueType, index: u32) -> SaiResult<Handle> {
    let map = u16::try_from(port).map_err(|_| SaiError::InvalidPortNumber { port })?;
    Ok(Handle::encode_with_map(ObjectType::Queue, queue_type as u8, map, index))
}

/// Splits a queue handle into its type and SDK selector.
pub(crate) fn decode_queue(ctx: &SwitchContext, handle: Handle) -> SaiResult<(QueueType, QueueSelector)> {
    let invalid = || SaiError::InvalidObjectId { handle };
    if handle.decode_type() != ObjectType::Queue {
        return Err(SaiError::InvalidObjectType {
            expected: ObjectType::Queue,
            handle,
        });
    }
    let queue_type = QueueType::from_raw(handle.decode_subtype()).ok_or_else(invalid)?;
    let port = u32::from(handle.decode_map());
    let index = handle.index();
    if !ctx.has_port(port) || index >= ctx.queues_per_port() {
        return Err(invalid());
    }
    let selector = QueueSelector {
        port,
        index,
        multicast: queue_type == QueueType::Multicast,
    };
    Ok((queue_type, selector))
}

impl<S: SwitchSdk> SaiSwitch<S> {
    pub fn set_queue_attribute(&mut self, queue_id: Handle, attr: &Attribute<QueueAttr>) -> SaiResult<()> {
        let (sdk, ctx) = self.parts_mut()?;
        let (_, selector) = decode_queue(ctx, queue_id)?;

        match attr.id {
            QueueAttr::SchedulerProfileId => {
                let profile = attr.as_oid()?;
                bind_scheduler(sdk, ctx, queue_id, SchedulerTarget::Queue(selector), profile)
            }
            QueueAttr::Type => Err(SaiError::invalid_parameter("SAI_QUEUE_ATTR_TYPE is read-only")),
            QueueAttr::WredProfileId | QueueAttr::BufferProfileId => {
                debug_log!(SaiApi::Queue, queue = ?queue_id, attr = ?attr.id, "queue attribute not supported");
                Err(SaiError::not_supported(format!("queue {:?}", attr.id)))
            }
        }
    }

    pub fn get_queue_attribute(&self, queue_id: Handle, attrs: &mut [Attribute<QueueAttr>]) -> SaiResult<()> {
        let ctx = self.context()?;
        check_get_list(attrs)?;
        let (queue_type, _) = decode_queue(ctx, queue_id)?;

        for attr in attrs.iter_mut() {
            attr.value = match attr.id {
                QueueAttr::Type => AttributeValue::S32(queue_type as i32),
                QueueAttr::SchedulerProfileId => {
                    let bound = ctx.scheduler_bindings.get(&queue_id).copied();
                    AttributeValue::Oid(
                        bound.map_or(Handle::NULL, |id| Handle::encode(ObjectType::Scheduler, id)),
                    )
                }
                QueueAttr::WredProfileId | QueueAttr::BufferProfileId => {
                    return Err(SaiError::not_supported(format!("queue {:?}", attr.id)));
                }
            };
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::scheduler::SchedulerAttr;
    use crate::api::test_support::switch;
    use crate::error::SaiStatus;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_handle_layout() {
        let q = queue_handle(5, QueueType::Multicast, 2).unwrap();
        assert_eq!(q.decode_type(), ObjectType::Queue);
        assert_eq!(q.decode_map(), 5);
        assert_eq!(q.decode_subtype(), QueueType::Multicast as u8);
        assert_eq!(q.index(), 2);

        assert_eq!(
            queue_handle(70_000, QueueType::Unicast, 0).unwrap_err().status(),
            SaiStatus::InvalidPortNumber
        );
    }

    #[test]
    fn test_decode_validates() {
        let sw = switch();
        let ctx = sw.context().unwrap();
        let (kind, selector) = decode_queue(ctx, queue_handle(5, QueueType::Multicast, 2).unwrap()).unwrap();
        assert_eq!(kind, QueueType::Multicast);
        assert!(selector.multicast);

        let bad_port = queue_handle(50, QueueType::Unicast, 0).unwrap();
        let bad_index = queue_handle(1, QueueType::Unicast, 8).unwrap();
        let bad_kind = Handle::encode_with_map(ObjectType::Queue, 9, 1, 0);
        for handle in [bad_port, bad_index, bad_kind] {
            assert_eq!(
                decode_queue(ctx, handle).unwrap_err().status(),
                SaiStatus::InvalidObjectId
            );
        }
    }

    #[test]
    fn test_scheduler_on_queue() {
        let mut sw = switch();
        let sched = sw
            .create_scheduler_profile(&[Attribute::new(
                SchedulerAttr::SchedulingWeight,
                AttributeValue::U8(40),
            )])
            .unwrap();
        let queue = queue_handle(1, QueueType::Unicast, 0).unwrap();
        sw.set_queue_attribute(queue, &Attribute::new(QueueAttr::SchedulerProfileId, AttributeValue::Oid(sched)))
            .unwrap();

        let mut attrs = vec![
            Attribute::query(QueueAttr::Type),
            Attribute::query(QueueAttr::SchedulerProfileId),
        ];
        sw.get_queue_attribute(queue, &mut attrs).unwrap();
        assert_eq!(attrs[0].value, AttributeValue::S32(QueueType::Unicast as i32));
        assert_eq!(attrs[1].value, AttributeValue::Oid(sched));

        let selector = QueueSelector {
            port: 1,
            index: 0,
            multicast: false,
        };
        assert_eq!(sw.sdk().queue_scheduler(selector).unwrap().weight, 40);
    }

    #[test]
    fn test_unsupported_profiles() {
        let mut sw = switch();
        let queue = queue_handle(1, QueueType::Unicast, 0).unwrap();
        let err = sw
            .set_queue_attribute(queue, &Attribute::new(QueueAttr::WredProfileId, AttributeValue::Oid(Handle::NULL)))
            .unwrap_err();
        assert_eq!(err.status(), SaiStatus::NotSupported);
    }
}
