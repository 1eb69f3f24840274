use tracing::debug;

use crate::attribute::names;
use crate::EngineError;

use super::TurnSystemContext;

/// Fire spreads one cell per turn and consumes its source.
///
/// Both passes read only `frozen`, so an entity ignited this turn neither
/// spreads nor burns out until the next one.
pub(crate) fn run_burning_system(context: &mut TurnSystemContext<'_>) -> Result<(), EngineError> {
    let frozen = context.frozen;
    let burning = context.catalog.resolve(names::BURNING);

    for source in frozen.find_by_attribute(names::BURNING) {
        let neighbours = frozen.adjacent4(source.position(), source.layer());
        for neighbour in neighbours.into_iter().flatten() {
            if !neighbour.has_attribute(names::FLAMMABLE) {
                continue;
            }
            let Some(target) = context.next.get(neighbour.position(), neighbour.layer()) else {
                continue;
            };
            if let Some(ignited) = target.with_attribute(&burning) {
                debug!(
                    entity = %ignited.entity(),
                    position = %ignited.position(),
                    from = %source.entity(),
                    "entity_ignited"
                );
                context.outcome.ignited.push(ignited.entity());
                context.next.replace(ignited);
            }
        }
    }

    for source in frozen.find_by_attribute(names::BURNING) {
        if source.has_attribute(names::UNEXTINGUISHABLE)
            || source.has_attribute(names::PERMANENT_FIRE)
        {
            continue;
        }
        debug!(entity = %source.entity(), position = %source.position(), "entity_burned_out");
        context.next.set(source.position(), source.layer(), None);
        context.outcome.burned_out.push(source.entity());
    }
    Ok(())
}
