use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "ride_status")]
pub enum RideStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "assigned")]
    Assigned,
    #[sea_orm(string_value = "accepted")]
    Accepted,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl RideStatus {
    /// A bound request has a driver reference set. Holds exactly for these
    /// states; `cancelled` clears the binding when it is entered.
    pub fn is_bound(&self) -> bool {
        matches!(
            self,
            RideStatus::Assigned | RideStatus::Accepted | RideStatus::InProgress | RideStatus::Completed
        )
    }

    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RideStatus::Completed | RideStatus::Cancelled)
    }

    /// Active states occupy the bound driver.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RideStatus::Assigned | RideStatus::Accepted | RideStatus::InProgress
        )
    }

    pub fn can_transition_to(&self, next: RideStatus) -> bool {
        use RideStatus::*;
        match (self, next) {
            (Pending, Assigned) => true,
            // Self-service acceptance binds straight from pending
            (Pending, Accepted) => true,
            // Driver acknowledging an admin assignment
            (Assigned, Accepted) => true,
            (Accepted, InProgress) => true,
            // Completion is allowed from any bound, non-terminal state
            (Assigned, Completed) | (Accepted, Completed) | (InProgress, Completed) => true,
            // Administrative cancellation from any non-terminal state
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ride_request")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub passenger_id: i32,
    pub driver_id: Option<i32>,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub pickup_lat: Option<f64>,
    pub pickup_lng: Option<f64>,
    pub dropoff_lat: Option<f64>,
    pub dropoff_lng: Option<f64>,
    pub vehicle_category: super::driver::VehicleCategory,
    pub status: RideStatus,
    pub fare_amount: Option<f64>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub accepted_at: Option<DateTimeWithTimeZone>,
    pub completed_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Driver reference set iff the status is in the bound-or-later set.
    pub fn holds_binding_invariant(&self) -> bool {
        self.driver_id.is_some() == self.status.is_bound()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::PassengerId",
        to = "super::user::Column::Id"
    )]
    Passenger,
    #[sea_orm(
        belongs_to = "super::driver::Entity",
        from = "Column::DriverId",
        to = "super::driver::Column::Id"
    )]
    Driver,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Passenger.def()
    }
}

impl Related<super::driver::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Driver.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::RideStatus::*;
    use super::*;

    #[test]
    fn test_forward_transitions() {
        assert!(Pending.can_transition_to(Assigned));
        assert!(Pending.can_transition_to(Accepted));
        assert!(Assigned.can_transition_to(Accepted));
        assert!(Accepted.can_transition_to(InProgress));
        assert!(Assigned.can_transition_to(Completed));
        assert!(Accepted.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Completed));
    }

    #[test]
    fn test_no_backward_transitions() {
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(InProgress));
        assert!(!InProgress.can_transition_to(Pending));
        assert!(!Accepted.can_transition_to(Pending));
        assert!(!Assigned.can_transition_to(Pending));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for next in [Pending, Assigned, Accepted, InProgress, Completed, Cancelled] {
            assert!(!Completed.can_transition_to(next));
            assert!(!Cancelled.can_transition_to(next));
        }
    }

    #[test]
    fn test_cancellation_from_non_terminal() {
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Assigned.can_transition_to(Cancelled));
        assert!(Accepted.can_transition_to(Cancelled));
        assert!(InProgress.can_transition_to(Cancelled));
    }

    #[test]
    fn test_bound_set_matches_active_plus_completed() {
        assert!(!Pending.is_bound());
        assert!(!Cancelled.is_bound());
        for s in [Assigned, Accepted, InProgress] {
            assert!(s.is_bound());
            assert!(s.is_active());
        }
        assert!(Completed.is_bound());
        assert!(!Completed.is_active());
    }

    #[test]
    fn test_pending_cannot_skip_to_in_progress() {
        assert!(!Pending.can_transition_to(InProgress));
        assert!(!Pending.can_transition_to(Completed));
    }
}
