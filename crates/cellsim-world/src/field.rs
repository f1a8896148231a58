//! Environment pass applied to every organism each physics tick.

use crate::world::World;
use cellsim_core::{FieldConfig, HazardZone, Vec2};

/// Current, drag and hazard zones of the field
#[derive(Debug, Clone)]
pub struct OrganismField {
    pub force: Vec2,
    pub drag: f32,
    pub hazards: Vec<HazardZone>,
}

impl OrganismField {
    pub fn from_config(config: &FieldConfig) -> Self {
        Self {
            force: config.force,
            drag: config.drag,
            hazards: config.hazards.clone(),
        }
    }

    /// Push, damage and integrate every live organism.
    ///
    /// Physics-locked organisms neither receive the current nor move.
    /// Endobionts are carried along at their host's anchor.
    pub fn apply(&self, world: &mut World, dt: f32) {
        let bounds = world.bounds;
        let damping = (1.0 - self.drag * dt).max(0.0);

        let mut carried = Vec::new();
        for entity in world.entities.iter_mut() {
            if let Some(attachment) = entity.attached_to {
                carried.push((entity.id(), attachment));
            } else if entity.physics_locked {
                entity.velocity.clear();
            } else {
                let push = self.force * (entity.stats.velocity_receive_scale * dt);
                let v = (entity.velocity.get() + push) * damping;
                entity.velocity.set(v);
                entity.position = bounds.clamp(entity.position + v * dt, entity.radius());
            }

            for zone in &self.hazards {
                if zone.contains(entity.position) && !entity.stats.hazard_match(zone.kind) {
                    entity.stats.add_energy(-zone.damage * dt);
                }
            }
        }

        for (guest, attachment) in carried {
            let anchor = world
                .entities
                .get(attachment.host)
                .map(|host| host.position + host.internal.offset(attachment.anchor));
            if let Some(entity) = world.entities.get_mut(guest) {
                match anchor {
                    Some(position) => entity.position = position,
                    None => {
                        entity.attached_to = None;
                        entity.physics_locked = false;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::prefab::OrganismPrefab;
    use cellsim_core::{Bounds, HazardKind, OrganismConfig};
    use std::sync::Arc;

    fn world() -> (World, cellsim_core::TemplateId) {
        let registry = catalog::default_registry().unwrap();
        let grazer = catalog::grazer_template(&registry).unwrap();
        let prefab = Arc::new(OrganismPrefab::create("grazer", &grazer, &registry).unwrap());
        let mut world = World::new(OrganismConfig::default(), Bounds::centered(10.0, 10.0), 4, 1);
        world.register_pool(grazer.id, prefab, 4).unwrap();
        (world, grazer.id)
    }

    fn field(force: Vec2) -> OrganismField {
        OrganismField {
            force,
            drag: 0.0,
            hazards: Vec::new(),
        }
    }

    #[test]
    fn test_force_moves_free_organisms() {
        let (mut world, grazer) = world();
        let id = world.spawn(grazer, Vec2::ZERO, Vec2::Y).unwrap();
        field(Vec2::new(1.0, 0.0)).apply(&mut world, 1.0);

        let entity = world.entity(id).unwrap();
        let scale = entity.stats.velocity_receive_scale;
        assert!((entity.velocity.get().x - scale).abs() < 1e-5);
        assert!((entity.position.x - scale).abs() < 1e-5);
    }

    #[test]
    fn test_locked_organisms_stay_put() {
        let (mut world, grazer) = world();
        let id = world.spawn(grazer, Vec2::ZERO, Vec2::Y).unwrap();
        world.entity_mut(id).unwrap().physics_locked = true;
        field(Vec2::new(1.0, 0.0)).apply(&mut world, 1.0);
        assert_eq!(world.entity(id).unwrap().position, Vec2::ZERO);
    }

    #[test]
    fn test_positions_stay_in_bounds() {
        let (mut world, grazer) = world();
        let id = world.spawn(grazer, Vec2::new(4.0, 0.0), Vec2::Y).unwrap();
        field(Vec2::new(50.0, 0.0)).apply(&mut world, 1.0);
        let entity = world.entity(id).unwrap();
        assert!(entity.position.x + entity.radius() <= 5.0 + 1e-5);
    }

    #[test]
    fn test_hazard_spares_resistant() {
        let (mut world, grazer) = world();
        let id = world.spawn(grazer, Vec2::ZERO, Vec2::Y).unwrap();
        let start = world.entity(id).unwrap().stats.energy();
        let mut field = field(Vec2::ZERO);
        field.hazards.push(HazardZone {
            center: Vec2::ZERO,
            radius: 2.0,
            kind: HazardKind(7),
            damage: 4.0,
        });

        field.apply(&mut world, 0.5);
        assert!((world.entity(id).unwrap().stats.energy() - (start - 2.0)).abs() < 1e-4);

        world.entity_mut(id).unwrap().stats.hazard_resistances.push(HazardKind(7));
        field.apply(&mut world, 0.5);
        assert!((world.entity(id).unwrap().stats.energy() - (start - 2.0)).abs() < 1e-4);
    }
}
