use super::{BBox, VehicleTrack};

/// The first track, in the given order, whose box strictly contains `plate`,
/// or [`VehicleTrack::none`] when no track does.
///
/// With overlapping vehicle boxes the result depends on track order; the
/// tightest enclosing box is not searched for.
pub fn get_car(plate: &BBox, tracks: &[VehicleTrack]) -> VehicleTrack {
    tracks
        .iter()
        .find(|track| track.bbox.strictly_contains(plate))
        .copied()
        .unwrap_or_else(VehicleTrack::none)
}
