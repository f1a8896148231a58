//! Built-in component catalog and starter templates.

use crate::definition::*;
use crate::registry::ComponentRegistry;
use crate::spatial::SpatialTag;
use crate::template::OrganismTemplate;
use cellsim_core::{ComponentId, EnergyKind, HazardKind, Result, StatBlock, TemplateId, Vec2};

pub const PROTOCELL: ComponentId = ComponentId(1);
pub const SEEDLING: ComponentId = ComponentId(2);
pub const NUCLEUS: ComponentId = ComponentId(10);
pub const MEMBRANE: ComponentId = ComponentId(11);
pub const CHLOROPLAST: ComponentId = ComponentId(12);
pub const FLAGELLUM: ComponentId = ComponentId(20);
pub const CILIA: ComponentId = ComponentId(21);
pub const CONTACT: ComponentId = ComponentId(30);
pub const GRAB: ComponentId = ComponentId(31);
pub const TENTACLE: ComponentId = ComponentId(32);
pub const VACUUM: ComponentId = ComponentId(33);
pub const PSEUDOPODIA: ComponentId = ComponentId(34);
pub const ROOT: ComponentId = ComponentId(40);

pub const GRAZER: TemplateId = TemplateId(1);
pub const HUNTER: TemplateId = TemplateId(2);
pub const PLANT: TemplateId = TemplateId(3);

/// Energy kind most organisms feed on
pub const NUTRIENT: EnergyKind = EnergyKind(0);
/// Hazard the membrane protects against
pub const ACID: HazardKind = HazardKind(0);

fn component(id: ComponentId, name: &str, anchor: &str, stats: StatBlock, kind: ComponentKind) -> ComponentDefinition {
    ComponentDefinition {
        id,
        info: DisplayInfo {
            name: name.to_string(),
            description: String::new(),
            icon: Some(format!("icons/{}", name.to_lowercase())),
        },
        anchor: anchor.to_string(),
        edit_visual: Some(format!("edit/{}", name.to_lowercase())),
        sim_visual: Some(format!("sim/{}", name.to_lowercase())),
        stats: stats.into(),
        kind,
    }
}

fn anchor(name: &str, x: f32, y: f32) -> BodyAnchor {
    BodyAnchor {
        name: name.to_string(),
        offset: Vec2::new(x, y),
    }
}

fn group(name: &str, options: &[ComponentId]) -> ComponentGroup {
    ComponentGroup {
        name: name.to_string(),
        options: options.to_vec(),
    }
}

fn protocell() -> ComponentDefinition {
    let stats = StatBlock {
        mass: 1.0,
        forward_accel: 1.0,
        turn_accel: 1.0,
        speed_limit: 2.0,
        velocity_receive_scale: 1.0,
        energy_capacity: 100.0,
        energy_consume_rate: 20.0,
        lifespan: 90.0,
        energy_sources: vec![NUTRIENT],
        energy_share: 0.5,
        ..Default::default()
    };
    let body = BodyDefinition {
        plan: BodyPlan::SingleCell(SingleCellTuning::default()),
        radius: 0.5,
        anchors: vec![
            anchor("tail", 0.0, -0.5),
            anchor("side", 0.45, 0.0),
            anchor("side", -0.45, 0.0),
            anchor("mouth", 0.0, 0.5),
        ],
        internal_anchors: vec![Vec2::new(0.15, 0.0), Vec2::new(-0.15, 0.0), Vec2::new(0.0, -0.15)],
        sensor: SensorSettings {
            delay: 0.25,
            energy_check_radius: 3.0,
            organism_check_radius: 3.0,
            organism_tags: vec![SpatialTag::Organism],
        },
        essentials: vec![NUCLEUS, MEMBRANE],
        groups: vec![
            group("locomotion", &[FLAGELLUM, CILIA]),
            group("feeding", &[CONTACT, GRAB, TENTACLE, VACUUM, PSEUDOPODIA]),
        ],
    };
    component(PROTOCELL, "Protocell", "", stats, ComponentKind::Body(body))
}

fn seedling() -> ComponentDefinition {
    let stats = StatBlock {
        mass: 3.0,
        energy_capacity: 60.0,
        energy_consume_rate: 5.0,
        lifespan: 120.0,
        energy_sources: vec![NUTRIENT],
        energy_share: 0.5,
        ..Default::default()
    };
    let body = BodyDefinition {
        plan: BodyPlan::Magnoliophyta,
        radius: 0.6,
        anchors: vec![anchor("base", 0.0, -0.6)],
        internal_anchors: Vec::new(),
        sensor: SensorSettings::default(),
        essentials: vec![CHLOROPLAST],
        groups: vec![group("roots", &[ROOT])],
    };
    component(SEEDLING, "Seedling", "", stats, ComponentKind::Body(body))
}

/// Every built-in definition
pub fn default_definitions() -> Vec<ComponentDefinition> {
    let part = |mass: f32, danger: f32| StatBlock {
        mass,
        danger,
        ..Default::default()
    };

    vec![
        protocell(),
        seedling(),
        component(
            NUCLEUS,
            "Nucleus",
            "",
            StatBlock {
                energy_capacity: 20.0,
                ..Default::default()
            },
            ComponentKind::Essential,
        ),
        component(
            MEMBRANE,
            "Membrane",
            "",
            StatBlock {
                mass: 0.2,
                hazard_resistances: vec![ACID],
                ..Default::default()
            },
            ComponentKind::Essential,
        ),
        component(CHLOROPLAST, "Chloroplast", "", part(0.2, 0.0), ComponentKind::Essential),
        component(
            FLAGELLUM,
            "Flagellum",
            "tail",
            part(0.1, 0.0),
            ComponentKind::Motility(MotilityTuning {
                forward_speed: 1.5,
                turn_speed: 120.0,
                change_delay: 1.5,
                energy_min_scale: 0.1,
                energy_rate: 0.5,
            }),
        ),
        component(
            CILIA,
            "Cilia",
            "side",
            part(0.1, 0.0),
            ComponentKind::Motility(MotilityTuning {
                forward_speed: 0.8,
                turn_speed: 200.0,
                change_delay: 0.8,
                energy_min_scale: 0.05,
                energy_rate: 0.25,
            }),
        ),
        component(
            CONTACT,
            "Maw",
            "mouth",
            part(0.3, 1.0),
            ComponentKind::HunterContact(ContactTuning { contact_angle: 120.0 }),
        ),
        component(
            GRAB,
            "Grabber",
            "side",
            part(0.5, 1.5),
            ComponentKind::HunterGrab(GrabTuning {
                grab_radius: 1.5,
                grab_delay: 1.0,
                grab_count: 2,
            }),
        ),
        component(
            TENTACLE,
            "Tentacle",
            "mouth",
            part(0.4, 1.0),
            ComponentKind::HunterTentacle(TentacleTuning {
                tentacle_count: 2,
                tentacle_radius: 3.0,
                tract_delay: 0.5,
                absorb_range_min: 0.8,
                absorb_range_max: 3.5,
                pull_accel: 1.0,
            }),
        ),
        component(
            VACUUM,
            "Siphon",
            "mouth",
            part(0.4, 1.0),
            ComponentKind::HunterVacuum(VacuumTuning {
                vacuum_radius: 2.5,
                vacuum_accel: 3.0,
                vacuum_angle: 90.0,
            }),
        ),
        component(
            PSEUDOPODIA,
            "Pseudopod",
            "arm",
            part(0.3, 0.5),
            ComponentKind::Pseudopodia(PseudopodiaTuning { reach: 1.0 }),
        ),
        component(ROOT, "Root", "base", part(0.5, 0.0), ComponentKind::Generic),
    ]
}

pub fn default_registry() -> Result<ComponentRegistry> {
    ComponentRegistry::from_definitions(default_definitions())
}

/// Fill every essential slot of `template` with its body's essential
fn fill_essentials(template: &mut OrganismTemplate, registry: &ComponentRegistry) -> Result<()> {
    let essentials = registry
        .body(template.body_id())
        .map(|body| body.essentials.clone())
        .unwrap_or_default();
    for (slot, id) in essentials.into_iter().enumerate() {
        template.set_essential(registry, slot, id)?;
    }
    Ok(())
}

/// Flagellated filter feeder that only eats loose nutrients
pub fn grazer_template(registry: &ComponentRegistry) -> Result<OrganismTemplate> {
    let mut template = OrganismTemplate::with_body(GRAZER, registry, PROTOCELL)?;
    fill_essentials(&mut template, registry)?;
    template.set_component(registry, 2, ComponentId::INVALID)?;
    template.drain_events();
    Ok(template)
}

/// Predator that grabs smaller cells
pub fn hunter_template(registry: &ComponentRegistry) -> Result<OrganismTemplate> {
    let mut template = OrganismTemplate::with_body(HUNTER, registry, PROTOCELL)?;
    fill_essentials(&mut template, registry)?;
    template.set_component(registry, 1, CILIA)?;
    template.set_component(registry, 2, GRAB)?;
    template.drain_events();
    Ok(template)
}

/// Rooted plant
pub fn plant_template(registry: &ComponentRegistry) -> Result<OrganismTemplate> {
    let mut template = OrganismTemplate::with_body(PLANT, registry, SEEDLING)?;
    fill_essentials(&mut template, registry)?;
    template.drain_events();
    Ok(template)
}

/// Starter templates with their display names
pub fn default_templates(registry: &ComponentRegistry) -> Result<Vec<(String, OrganismTemplate)>> {
    Ok(vec![
        ("grazer".to_string(), grazer_template(registry)?),
        ("hunter".to_string(), hunter_template(registry)?),
        ("plant".to_string(), plant_template(registry)?),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellsim_core::OrganismStats;

    #[test]
    fn test_default_registry_validates() {
        let registry = default_registry().unwrap();
        assert_eq!(registry.len(), default_definitions().len());
        assert!(registry.body(PROTOCELL).is_some());
        assert!(registry.body(SEEDLING).is_some());
    }

    #[test]
    fn test_default_templates_are_playable() {
        let registry = default_registry().unwrap();
        for (name, template) in default_templates(&registry).unwrap() {
            assert!(template.is_playable(), "{} is not playable", name);
        }
    }

    #[test]
    fn test_authored_stats_reach_definitions() {
        let registry = default_registry().unwrap();
        let protocell = &registry.get(PROTOCELL).unwrap().stats;
        assert_eq!(protocell.energy_capacity, 100.0);
        assert_eq!(protocell.lifespan, 90.0);
        assert_eq!(protocell.energy_sources, vec![NUTRIENT]);
        assert_eq!(protocell.energy(), 0.0);
        assert_eq!(registry.get(MEMBRANE).unwrap().stats.hazard_resistances, vec![ACID]);
    }

    #[test]
    fn test_hunter_can_eat_grazer() {
        let registry = default_registry().unwrap();
        let compose = |t: &OrganismTemplate| {
            let defs = t.resolve(&registry).unwrap();
            OrganismStats::compose(defs.iter().map(|d| &d.stats))
        };
        let grazer = compose(&grazer_template(&registry).unwrap());
        let hunter = compose(&hunter_template(&registry).unwrap());
        let plant = compose(&plant_template(&registry).unwrap());

        assert!(hunter.can_eat(&grazer));
        assert!(!grazer.can_eat(&hunter));
        assert!(!hunter.can_eat(&plant));
    }

    #[test]
    fn test_definitions_json_round_trip() {
        let json = serde_json::to_string(&default_definitions()).unwrap();
        let registry = ComponentRegistry::from_json_str(&json).unwrap();
        assert_eq!(registry.len(), default_definitions().len());
    }
}
