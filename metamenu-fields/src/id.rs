//! Field id generation.

use std::collections::HashSet;

use rand::distr::Alphanumeric;
use rand::Rng;

/// Length of a generated field id.
pub const FIELD_ID_LENGTH: usize = 6;

/// Generate a fresh alphanumeric id that is not in `existing`.
pub fn new_field_id<'a>(existing: impl IntoIterator<Item = &'a str>) -> String {
    let existing: HashSet<&str> = existing.into_iter().collect();
    new_field_id_with(&mut rand::rng(), &existing)
}

/// Same as [`new_field_id`] with a caller supplied random source.
pub fn new_field_id_with<R: Rng + ?Sized>(rng: &mut R, existing: &HashSet<&str>) -> String {
    loop {
        let id: String = (0..FIELD_ID_LENGTH)
            .map(|_| char::from(rng.sample(Alphanumeric)))
            .collect();
        if !existing.contains(id.as_str()) {
            return id;
        }
        tracing::trace!(%id, "field id collision, drawing again");
    }
}
