//! [`Record`] implementation for [`Order`].
//!
//! This is where the data-model invariants are enforced for the in-memory
//! store: stages advance one step at a time, and nothing advances once the
//! durable cancelled flag is set.

use crate::framework::Record;
use crate::model::{Order, OrderCreate, OrderId, OrderPatch};
use crate::order_store::OrderError;

impl Record for Order {
    type Id = OrderId;
    type Create = OrderCreate;
    type Patch = OrderPatch;
    type Error = OrderError;

    fn from_create(id: OrderId, params: OrderCreate) -> Result<Self, Self::Error> {
        if params.item.trim().is_empty() {
            return Err(OrderError::EmptyItem);
        }
        Ok(Order::new(id, params.user_id, params.item))
    }

    fn apply(&mut self, patch: OrderPatch) -> Result<(), Self::Error> {
        match patch {
            OrderPatch::Advance(requested) => {
                if self.cancelled {
                    return Err(OrderError::Cancelled(self.id));
                }
                if self.stage.next() != Some(requested) {
                    return Err(OrderError::StageOutOfOrder {
                        id: self.id,
                        current: self.stage,
                        requested,
                    });
                }
                self.stage = requested;
                Ok(())
            }
            // Idempotent
            OrderPatch::Cancel => {
                self.cancelled = true;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Stage, UserId};

    fn order() -> Order {
        Order::from_create(
            OrderId(1),
            OrderCreate {
                user_id: UserId(7),
                item: "widget".to_string(),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_new_order_starts_created() {
        let order = order();
        assert_eq!(order.stage, Stage::Created);
        assert!(!order.cancelled);
        assert_eq!(order.user_id, UserId(7));
    }

    #[test]
    fn test_blank_item_is_rejected() {
        let result = Order::from_create(
            OrderId(1),
            OrderCreate {
                user_id: UserId(7),
                item: "   ".to_string(),
            },
        );
        assert_eq!(result, Err(OrderError::EmptyItem));
    }

    #[test]
    fn test_stages_advance_one_step_at_a_time() {
        let mut order = order();
        for stage in Stage::PIPELINE {
            order.apply(OrderPatch::Advance(stage)).unwrap();
        }
        assert_eq!(order.stage, Stage::Delivered);

        let mut fresh = self::order();
        let skipped = fresh.apply(OrderPatch::Advance(Stage::InTransit));
        assert_eq!(
            skipped,
            Err(OrderError::StageOutOfOrder {
                id: OrderId(1),
                current: Stage::Created,
                requested: Stage::InTransit,
            })
        );
        assert_eq!(fresh.stage, Stage::Created);

        fresh.apply(OrderPatch::Advance(Stage::Dispatched)).unwrap();
        let repeated = fresh.apply(OrderPatch::Advance(Stage::Dispatched));
        assert!(matches!(repeated, Err(OrderError::StageOutOfOrder { .. })));
    }

    #[test]
    fn test_no_stage_after_cancel() {
        let mut order = order();
        order.apply(OrderPatch::Advance(Stage::Dispatched)).unwrap();
        order.apply(OrderPatch::Cancel).unwrap();
        order.apply(OrderPatch::Cancel).unwrap();

        let result = order.apply(OrderPatch::Advance(Stage::InTransit));
        assert_eq!(result, Err(OrderError::Cancelled(OrderId(1))));
        assert_eq!(order.stage, Stage::Dispatched);
        assert!(order.cancelled);
    }
}
