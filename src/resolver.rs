use crate::persona::{Aspect, PersonaRegistry};

/// Resolve requested aspect ids against the persona catalog.
///
/// Matches come back in the persona's canonical order regardless of how the
/// caller ordered them. Unknown ids are dropped. When nothing is requested, or
/// nothing requested matches, the first-defined aspect is returned alone.
pub fn resolve_aspects<S: AsRef<str>>(
    registry: &PersonaRegistry,
    requested: &[S],
) -> Vec<&'static Aspect> {
    let mut positions: Vec<usize> = requested
        .iter()
        .filter_map(|id| registry.position(id.as_ref().trim()))
        .collect();
    positions.sort_unstable();
    positions.dedup();

    let aspects = registry.persona().aspects;
    let resolved: Vec<&'static Aspect> = positions.into_iter().map(|idx| &aspects[idx]).collect();
    if !resolved.is_empty() {
        return resolved;
    }

    registry.default_aspect().into_iter().collect()
}
