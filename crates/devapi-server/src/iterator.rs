//! Resumable walk over every entity and user service.
//!
//! A connection has to describe all entities and later stream all their
//! states, but must never block the main loop doing it. [`EntityIterator`]
//! is a cursor that handles at most one item per [`EntityIterator::advance`]
//! call. If the visitor cannot send (transport full), the cursor stays put and
//! the same item is retried on the next call.
//!
//! ```text
//! Idle -> Begin -> BinarySensor -> Cover -> Fan -> Light -> Sensor
//!      -> Switch -> TextSensor -> Service -> Done -> Idle
//! ```

use crate::entity::{BinarySensor, Cover, Entity, EntityRegistry, Fan, Light, Sensor, Switch, TextSensor};
use crate::service::UserService;

/// Position of an [`EntityIterator`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IteratorStage {
    /// Not running.
    #[default]
    Idle,
    Begin,
    BinarySensor,
    Cover,
    Fan,
    Light,
    Sensor,
    Switch,
    TextSensor,
    Service,
    Done,
}

impl IteratorStage {
    /// Stage after this one.
    pub fn next(self) -> Self {
        use IteratorStage::*;
        match self {
            Idle => Idle,
            Begin => BinarySensor,
            BinarySensor => Cover,
            Cover => Fan,
            Fan => Light,
            Light => Sensor,
            Sensor => Switch,
            Switch => TextSensor,
            TextSensor => Service,
            Service => Done,
            Done => Idle,
        }
    }
}

/// Receives the items of an [`EntityIterator`] walk.
///
/// Every hook returns whether the item was handled. `false` means "try the
/// same item again next time".
pub trait EntityVisitor {
    fn on_begin(&mut self) -> bool {
        true
    }

    fn on_binary_sensor(&mut self, entity: &dyn BinarySensor) -> bool;
    fn on_cover(&mut self, entity: &dyn Cover) -> bool;
    fn on_fan(&mut self, entity: &dyn Fan) -> bool;
    fn on_light(&mut self, entity: &dyn Light) -> bool;
    fn on_sensor(&mut self, entity: &dyn Sensor) -> bool;
    fn on_switch(&mut self, entity: &dyn Switch) -> bool;
    fn on_text_sensor(&mut self, entity: &dyn TextSensor) -> bool;

    fn on_service(&mut self, _service: &UserService) -> bool {
        true
    }

    fn on_end(&mut self) -> bool {
        true
    }
}

/// Cursor over the registry and user services.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityIterator {
    stage: IteratorStage,
    offset: usize,
}

/// Result of looking at the item under the cursor.
enum Step {
    /// Domain exhausted.
    NextStage,
    /// Item consumed (or skipped).
    Advance,
    /// Visitor could not take the item.
    Retry,
}

fn visit_entity<E: Entity + ?Sized, F>(items: &[std::sync::Arc<E>], offset: usize, visit: F) -> Step
where
    F: FnOnce(&E) -> bool,
{
    let Some(entity) = items.get(offset) else {
        return Step::NextStage;
    };
    if entity.is_internal() {
        return Step::Advance;
    }
    if visit(entity.as_ref()) {
        Step::Advance
    } else {
        Step::Retry
    }
}

impl EntityIterator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restart the walk from the beginning, even if one is in progress.
    pub fn begin(&mut self) {
        self.stage = IteratorStage::Begin;
        self.offset = 0;
    }

    pub fn stage(&self) -> IteratorStage {
        self.stage
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Whether a walk is in progress.
    pub fn is_active(&self) -> bool {
        self.stage != IteratorStage::Idle
    }

    /// Take one step.
    pub fn advance<V: EntityVisitor + ?Sized>(
        &mut self,
        registry: &EntityRegistry,
        services: &[UserService],
        visitor: &mut V,
    ) {
        let at = self.offset;
        let step = match self.stage {
            IteratorStage::Idle => return,
            IteratorStage::Begin => {
                if visitor.on_begin() {
                    Step::NextStage
                } else {
                    Step::Retry
                }
            }
            IteratorStage::BinarySensor => {
                visit_entity(registry.binary_sensors(), at, |e| visitor.on_binary_sensor(e))
            }
            IteratorStage::Cover => visit_entity(registry.covers(), at, |e| visitor.on_cover(e)),
            IteratorStage::Fan => visit_entity(registry.fans(), at, |e| visitor.on_fan(e)),
            IteratorStage::Light => visit_entity(registry.lights(), at, |e| visitor.on_light(e)),
            IteratorStage::Sensor => visit_entity(registry.sensors(), at, |e| visitor.on_sensor(e)),
            IteratorStage::Switch => visit_entity(registry.switches(), at, |e| visitor.on_switch(e)),
            IteratorStage::TextSensor => {
                visit_entity(registry.text_sensors(), at, |e| visitor.on_text_sensor(e))
            }
            IteratorStage::Service => match services.get(at) {
                None => Step::NextStage,
                Some(service) if visitor.on_service(service) => Step::Advance,
                Some(_) => Step::Retry,
            },
            IteratorStage::Done => {
                if visitor.on_end() {
                    self.stage = IteratorStage::Idle;
                }
                return;
            }
        };

        match step {
            Step::NextStage => {
                self.stage = self.stage.next();
                self.offset = 0;
            }
            Step::Advance => self.offset += 1,
            Step::Retry => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityInfo, SwitchCall};
    use std::sync::Arc;

    struct TestSwitch {
        info: EntityInfo,
    }

    impl Entity for TestSwitch {
        fn info(&self) -> &EntityInfo {
            &self.info
        }
    }

    impl Switch for TestSwitch {
        fn state(&self) -> bool {
            false
        }

        fn control(&self, _call: SwitchCall) {}
    }

    /// Records switch names; refuses the first `refuse` offers.
    #[derive(Default)]
    struct Recorder {
        seen: Vec<String>,
        refuse: usize,
        begins: usize,
        ends: usize,
    }

    impl EntityVisitor for Recorder {
        fn on_begin(&mut self) -> bool {
            self.begins += 1;
            true
        }

        fn on_binary_sensor(&mut self, _: &dyn BinarySensor) -> bool {
            true
        }

        fn on_cover(&mut self, _: &dyn Cover) -> bool {
            true
        }

        fn on_fan(&mut self, _: &dyn Fan) -> bool {
            true
        }

        fn on_light(&mut self, _: &dyn Light) -> bool {
            true
        }

        fn on_sensor(&mut self, _: &dyn Sensor) -> bool {
            true
        }

        fn on_switch(&mut self, entity: &dyn Switch) -> bool {
            if self.refuse > 0 {
                self.refuse -= 1;
                return false;
            }
            self.seen.push(entity.info().name().to_string());
            true
        }

        fn on_text_sensor(&mut self, _: &dyn TextSensor) -> bool {
            true
        }

        fn on_end(&mut self) -> bool {
            self.ends += 1;
            true
        }
    }

    fn registry_with(names: &[(&str, bool)]) -> EntityRegistry {
        let mut registry = EntityRegistry::new();
        for (name, internal) in names {
            registry
                .register_switch(Arc::new(TestSwitch {
                    info: EntityInfo::new(*name).with_internal(*internal),
                }))
                .unwrap();
        }
        registry
    }

    fn run_to_idle(it: &mut EntityIterator, registry: &EntityRegistry, v: &mut Recorder) -> usize {
        let mut ticks = 0;
        while it.is_active() {
            it.advance(registry, &[], v);
            ticks += 1;
            assert!(ticks < 1000, "iterator did not finish");
        }
        ticks
    }

    #[test]
    fn test_idle_is_noop() {
        let registry = registry_with(&[("a", false)]);
        let mut it = EntityIterator::new();
        let mut v = Recorder::default();
        it.advance(&registry, &[], &mut v);
        assert_eq!(it.stage(), IteratorStage::Idle);
        assert_eq!(v.begins, 0);
    }

    #[test]
    fn test_visits_visible_entities_once() {
        let registry = registry_with(&[("one", false), ("hidden", true), ("two", false)]);
        let mut it = EntityIterator::new();
        let mut v = Recorder::default();
        it.begin();
        run_to_idle(&mut it, &registry, &mut v);

        assert_eq!(v.seen, vec!["one", "two"]);
        assert_eq!(v.begins, 1);
        assert_eq!(v.ends, 1);

        // Further steps do nothing.
        it.advance(&registry, &[], &mut v);
        assert_eq!(v.ends, 1);
    }

    #[test]
    fn test_internal_entity_consumes_a_tick() {
        let visible = registry_with(&[("a", false), ("b", false)]);
        let mixed = registry_with(&[("a", false), ("x", true), ("b", false)]);

        let mut it = EntityIterator::new();
        it.begin();
        let base = run_to_idle(&mut it, &visible, &mut Recorder::default());
        it.begin();
        let with_internal = run_to_idle(&mut it, &mixed, &mut Recorder::default());
        assert_eq!(with_internal, base + 1);
    }

    #[test]
    fn test_refused_item_is_retried() {
        let registry = registry_with(&[("a", false), ("b", false)]);
        let mut it = EntityIterator::new();
        let mut v = Recorder {
            refuse: 3,
            ..Default::default()
        };
        it.begin();
        run_to_idle(&mut it, &registry, &mut v);
        assert_eq!(v.seen, vec!["a", "b"]);
    }

    #[test]
    fn test_begin_restarts_walk() {
        let registry = registry_with(&[("a", false), ("b", false)]);
        let mut it = EntityIterator::new();
        let mut v = Recorder::default();
        it.begin();
        for _ in 0..8 {
            it.advance(&registry, &[], &mut v);
        }
        assert_eq!(it.stage(), IteratorStage::Switch);
        it.begin();
        assert_eq!(it.stage(), IteratorStage::Begin);
        assert_eq!(it.offset(), 0);
        run_to_idle(&mut it, &registry, &mut v);
        assert_eq!(v.begins, 2);
    }

    #[test]
    fn test_stage_order() {
        let mut stage = IteratorStage::Begin;
        let mut order = vec![stage];
        while stage != IteratorStage::Idle {
            stage = stage.next();
            order.push(stage);
        }
        assert_eq!(order.len(), 11);
        assert_eq!(order[9], IteratorStage::Done);
    }
}
