use crate::audio::{EmitTarget, Glide};
use crate::config::EngineConfig;
use crate::graph::{
    ConnectOptions, ConnectionKind, NodeId, NodeKind, SoundParams, SourceParams, SourceStyle, Vec2,
};
use crate::pulse::{HopBudget, PulseEnvelope};
use crate::record::{Recorder, TraceEvent};
use crate::retrigger::RetriggerConfig;
use crate::scene::ScenarioDescriptor;
use crate::transport::DEFAULT_SUBDIVISION;
use crate::tuning::KeyTarget;
use crate::world::World;

fn world() -> (World, Recorder) {
    let recorder = Recorder::recording();
    let world = World::with_recorder(EngineConfig::seeded(7), &recorder);
    (world, recorder)
}

fn at(x: f32) -> Vec2 {
    Vec2::new(x, 0.0)
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}

fn activations(recorder: &Recorder, node: NodeId) -> Vec<f64> {
    recorder
        .events()
        .unwrap()
        .into_iter()
        .filter_map(|event| match event {
            TraceEvent::Activated {
                time_seconds,
                node: activated,
                ..
            } if activated == node => Some(time_seconds),
            _ => None,
        })
        .collect()
}

#[test]
fn half_gate_passes_every_second_pulse() {
    let (mut world, recorder) = world();
    let ids = ScenarioDescriptor::gate_demo().build_world(&mut world).unwrap();

    world.run_until(2.0);
    world.settle();

    let fired = recorder
        .hops()
        .unwrap()
        .into_iter()
        .filter(|hop| hop.origin == ids["pulsar"])
        .count();
    assert_eq!(fired, 8);

    let emissions = recorder.emissions_for(ids["orb"]).unwrap();
    assert_eq!(emissions.len(), 4);
    assert!(emissions.iter().all(|emission| emission.note == Some(60)));
    assert_eq!(world.pending_events(), 0);
}

#[test]
fn delays_accumulate_along_a_chain() {
    let (mut world, recorder) = world();
    let a = world.add_node(NodeKind::Relay, at(0.0));
    let b = world.add_node(NodeKind::Relay, at(100.0));
    let c = world.add_node(NodeKind::Relay, at(300.0));
    let d = world.add_node(NodeKind::sound(0), at(400.0));
    world.connect(a, b, ConnectionKind::Plain).unwrap();
    world.connect(b, c, ConnectionKind::Plain).unwrap();
    world.connect(c, d, ConnectionKind::Plain).unwrap();

    world.inject(a, PulseEnvelope::default());
    world.settle();

    let emissions = recorder.emissions_for(d).unwrap();
    assert_eq!(emissions.len(), 1);
    assert_close(emissions[0].time_seconds, 2.0);
    assert_close(world.now(), 2.0);
}

#[test]
fn moved_nodes_change_the_next_delay() {
    let (mut world, recorder) = world();
    let a = world.add_node(NodeKind::Relay, at(0.0));
    let b = world.add_node(NodeKind::sound(0), at(100.0));
    world.connect(a, b, ConnectionKind::Plain).unwrap();

    world.move_node(b, at(200.0)).unwrap();
    world.inject(a, PulseEnvelope::default());
    world.settle();

    assert_close(recorder.emissions_for(b).unwrap()[0].time_seconds, 1.0);
}

fn hop_chain(max_hops: Option<u32>) -> (World, Recorder, NodeId) {
    let (mut world, recorder) = world();
    let mut params = SourceParams::pulsar(0.25);
    if let Some(max_hops) = max_hops {
        params = params.with_max_hops(max_hops);
    }
    let source = world.add_node(NodeKind::Source(params), at(0.0));
    let r1 = world.add_node(NodeKind::Relay, at(20.0));
    let r2 = world.add_node(NodeKind::Relay, at(40.0));
    let orb = world.add_node(NodeKind::sound(0), at(60.0));
    world.connect(source, r1, ConnectionKind::Plain).unwrap();
    world.connect(r1, r2, ConnectionKind::Plain).unwrap();
    world.connect(r2, orb, ConnectionKind::Plain).unwrap();

    world.run_until(0.25);
    world.settle();
    (world, recorder, orb)
}

#[test]
fn hop_budget_limits_how_far_a_wave_travels() {
    let (_, recorder, orb) = hop_chain(Some(2));
    assert_eq!(recorder.hops().unwrap().len(), 2);
    assert!(recorder.emissions_for(orb).unwrap().is_empty());

    let (_, recorder, orb) = hop_chain(Some(3));
    assert_eq!(recorder.hops().unwrap().len(), 3);
    assert_eq!(recorder.emissions_for(orb).unwrap().len(), 1);
}

#[test]
fn chain_delay_does_not_depend_on_the_hop_budget() {
    for max_hops in [Some(3), None] {
        let (_, recorder, orb) = hop_chain(max_hops);
        let emissions = recorder.emissions_for(orb).unwrap();
        assert_eq!(emissions.len(), 1, "budget {max_hops:?}");
        assert_close(emissions[0].time_seconds, 0.55);
    }
}

#[test]
fn a_wave_activates_each_node_once_in_a_diamond() {
    let (mut world, recorder) = world();
    let top = world.add_node(NodeKind::Relay, Vec2::new(0.0, 0.0));
    let left = world.add_node(NodeKind::Relay, Vec2::new(-50.0, 50.0));
    let right = world.add_node(NodeKind::Relay, Vec2::new(50.0, 50.0));
    let bottom = world.add_node(NodeKind::sound(0), Vec2::new(0.0, 100.0));
    world.connect(top, left, ConnectionKind::Plain).unwrap();
    world.connect(top, right, ConnectionKind::Plain).unwrap();
    world.connect(left, bottom, ConnectionKind::Plain).unwrap();
    world.connect(right, bottom, ConnectionKind::Plain).unwrap();

    let wave = world.inject(top, PulseEnvelope::default());
    world.settle();

    assert_eq!(recorder.emissions_for(bottom).unwrap().len(), 1);
    assert_eq!(world.last_wave(bottom), Some(wave));
    assert_eq!(world.pending_events(), 0);
}

#[test]
fn unbounded_waves_terminate_on_cycles() {
    let (mut world, recorder) = world();
    let ring: Vec<NodeId> = (0..5)
        .map(|index| world.add_node(NodeKind::Relay, at(index as f32 * 30.0)))
        .collect();
    for pair in ring.windows(2) {
        world.connect(pair[0], pair[1], ConnectionKind::Plain).unwrap();
    }
    world.connect(ring[4], ring[0], ConnectionKind::Plain).unwrap();
    let orb = world.add_node(NodeKind::sound(0), Vec2::new(60.0, 40.0));
    world.connect(ring[2], orb, ConnectionKind::Plain).unwrap();

    world.inject(ring[0], PulseEnvelope::default());
    let fired = world.settle();

    assert!(fired < 20, "fired {fired} events");
    assert_eq!(world.pending_events(), 0);
    assert_eq!(recorder.emissions_for(orb).unwrap().len(), 1);
    for node in ring {
        assert_eq!(activations(&recorder, node).len(), 1);
    }
}

#[test]
fn reflector_sends_a_new_wave_back() {
    let (mut world, recorder) = world();
    let relay = world.add_node(NodeKind::Relay, at(0.0));
    let mirror = world.add_node(NodeKind::Reflector, at(100.0));
    world.connect(relay, mirror, ConnectionKind::Plain).unwrap();

    let wave = world.inject(relay, PulseEnvelope::default());
    world.settle();

    let hops = recorder.hops().unwrap();
    assert_eq!(hops.len(), 2);
    assert_eq!((hops[0].origin, hops[0].wave), (relay, wave));
    assert_eq!(hops[1].origin, mirror);
    assert_ne!(hops[1].wave, wave);
    assert_eq!(world.last_wave(relay), Some(hops[1].wave));
    assert_eq!(activations(&recorder, relay).len(), 2);
    assert_close(world.now(), 1.0);
}

#[test]
fn switch_only_listens_to_its_latched_input() {
    let (mut world, recorder) = world();
    let a = world.add_node(NodeKind::Relay, Vec2::new(0.0, 0.0));
    let b = world.add_node(NodeKind::Relay, Vec2::new(0.0, 100.0));
    let switch = world.add_node(NodeKind::Switch { latched: None }, Vec2::new(100.0, 0.0));
    let orb = world.add_node(NodeKind::sound(0), Vec2::new(200.0, 0.0));
    let from_a = world.connect(a, switch, ConnectionKind::Plain).unwrap();
    world.connect(b, switch, ConnectionKind::Plain).unwrap();
    world.connect(switch, orb, ConnectionKind::Plain).unwrap();

    world.inject(a, PulseEnvelope::default());
    world.settle();
    assert_eq!(recorder.emissions_for(orb).unwrap().len(), 1);
    assert_eq!(
        world.graph().node(switch).unwrap().kind,
        NodeKind::Switch {
            latched: Some(from_a)
        }
    );

    world.inject(b, PulseEnvelope::default());
    world.settle();
    assert_eq!(recorder.emissions_for(orb).unwrap().len(), 1);

    world.inject(a, PulseEnvelope::default());
    world.settle();
    assert_eq!(recorder.emissions_for(orb).unwrap().len(), 2);

    world.reset_switch(switch).unwrap();
    world.inject(b, PulseEnvelope::default());
    world.settle();
    assert_eq!(recorder.emissions_for(orb).unwrap().len(), 3);
}

#[test]
fn removing_the_target_mid_flight_is_silent() {
    let (mut world, recorder) = world();
    let relay = world.add_node(NodeKind::Relay, at(0.0));
    let orb = world.add_node(NodeKind::sound(0), at(200.0));
    world.connect(relay, orb, ConnectionKind::Plain).unwrap();

    world.inject(relay, PulseEnvelope::default());
    world.run_until(0.5);
    assert_eq!(world.pending_events(), 1);

    world.remove_node(orb).unwrap();
    assert_eq!(world.graph().connection_count(), 0);
    world.settle();

    assert!(recorder.emissions().unwrap().is_empty());
    assert_eq!(world.pending_events(), 0);
}

#[test]
fn disconnecting_mid_flight_drops_the_pulse() {
    let (mut world, recorder) = world();
    let relay = world.add_node(NodeKind::Relay, at(0.0));
    let orb = world.add_node(NodeKind::sound(0), at(200.0));
    let link = world.connect(relay, orb, ConnectionKind::Plain).unwrap();

    world.inject(relay, PulseEnvelope::default());
    world.run_until(0.5);
    world.disconnect(link).unwrap();
    world.settle();

    assert!(recorder.emissions_for(orb).unwrap().is_empty());
    assert!(world.disconnect(link).is_err());
}

#[test]
fn synced_source_waits_for_the_next_beat() {
    let (mut world, recorder) = world();
    world.transport_mut().sync_enabled = true;
    world.run_until(0.1);

    let source = world.add_node(
        NodeKind::Source(SourceParams::pulsar(0.3).with_subdivision(DEFAULT_SUBDIVISION)),
        at(0.0),
    );
    world.tick();
    let clock = &world.graph().node(source).unwrap().clock;
    assert_eq!(clock.next_sync_fire_time, Some(0.5));

    world.run_until(1.2);
    let fires = activations(&recorder, source);
    assert_eq!(fires.len(), 2);
    assert_close(fires[0], 0.5);
    assert_close(fires[1], 1.0);
}

#[test]
fn sources_can_opt_out_of_global_sync() {
    let (mut world, recorder) = world();
    world.transport_mut().sync_enabled = true;
    let mut params = SourceParams::pulsar(0.3);
    params.ignore_global_sync = true;
    let source = world.add_node(NodeKind::Source(params), at(0.0));

    world.run_until(0.65);
    assert_eq!(activations(&recorder, source).len(), 2);
}

#[test]
fn disabled_sources_stay_quiet() {
    let (mut world, recorder) = world();
    let source = world.add_node(NodeKind::Source(SourceParams::pulsar(0.1)), at(0.0));
    world.set_enabled(source, false).unwrap();
    world.run_until(1.0);
    assert!(activations(&recorder, source).is_empty());
}

#[test]
fn retrigger_skips_muted_steps() {
    let (mut world, recorder) = world();
    let mut params = SoundParams::new(0);
    params.retrigger = RetriggerConfig::uniform(3, 0.1);
    params.retrigger.steps[1].muted = true;
    let orb = world.add_node(NodeKind::Sound(params), at(0.0));

    world.inject(orb, PulseEnvelope::default());
    world.settle();

    let emissions = recorder.emissions_for(orb).unwrap();
    assert_eq!(emissions.len(), 2);
    assert_close(emissions[0].time_seconds, 0.0);
    assert_close(emissions[1].time_seconds, 0.2);
    assert_eq!(emissions[1].step, Some(2));

    let steps: Vec<(usize, bool)> = recorder
        .events()
        .unwrap()
        .into_iter()
        .filter_map(|event| match event {
            TraceEvent::Step { step, muted, .. } => Some((step, muted)),
            _ => None,
        })
        .collect();
    assert_eq!(steps, vec![(0, false), (1, true), (2, false)]);
    assert_eq!(world.retrigger_step(orb), Some(2));
}

#[test]
fn a_new_activation_cancels_the_running_sequence() {
    let (mut world, recorder) = world();
    let mut params = SoundParams::new(0);
    params.retrigger = RetriggerConfig::uniform(4, 0.1);
    let orb = world.add_node(NodeKind::Sound(params), at(0.0));

    world.inject(orb, PulseEnvelope::default());
    world.tick();
    assert_eq!(world.pending_events(), 3);

    world.inject(orb, PulseEnvelope::default());
    world.tick();
    assert_eq!(world.pending_events(), 3);

    world.settle();
    assert_eq!(recorder.emissions_for(orb).unwrap().len(), 5);
}

#[test]
fn removing_a_node_cancels_its_steps() {
    let (mut world, recorder) = world();
    let mut params = SoundParams::new(0);
    params.retrigger = RetriggerConfig::uniform(4, 0.1);
    let orb = world.add_node(NodeKind::Sound(params), at(0.0));

    world.inject(orb, PulseEnvelope::default());
    world.tick();
    assert_eq!(world.pending_events(), 3);

    world.remove_node(orb).unwrap();
    assert_eq!(world.pending_events(), 0);
    world.settle();
    assert_eq!(recorder.emissions().unwrap().len(), 1);
}

#[test]
fn pitch_shift_moves_its_neighbours() {
    let (mut world, recorder) = world();
    let relay = world.add_node(NodeKind::Relay, at(0.0));
    let shifter = world.add_node(
        NodeKind::PitchShift {
            steps: 2,
            alternate: false,
            inverted: false,
        },
        at(50.0),
    );
    let orb = world.add_node(NodeKind::sound(0), at(100.0));
    world.connect(relay, shifter, ConnectionKind::Plain).unwrap();
    world.connect(shifter, orb, ConnectionKind::Plain).unwrap();

    world.inject(relay, PulseEnvelope::default());
    world.settle();

    assert_eq!(world.graph().node(orb).unwrap().kind.scale_index(), Some(2));
    let expected = world.tuning().note_for(2);
    assert_eq!(recorder.emissions_for(orb).unwrap()[0].note, Some(expected));
}

#[test]
fn key_setter_transposes_everything_downstream() {
    let (mut world, recorder) = world();
    let setter = world.add_node(
        NodeKind::KeySetter {
            target: KeyTarget::Transpose(5),
        },
        at(0.0),
    );
    let orb = world.add_node(NodeKind::sound(0), at(50.0));
    world.connect(setter, orb, ConnectionKind::Plain).unwrap();

    world.inject(setter, PulseEnvelope::default());
    world.settle();

    assert_eq!(world.tuning().transpose, 5);
    assert_eq!(recorder.emissions_for(orb).unwrap()[0].note, Some(65));
}

#[test]
fn extreme_transpose_clamps_instead_of_overflowing() {
    let (mut world, recorder) = world();
    let setter = world.add_node(
        NodeKind::KeySetter {
            target: KeyTarget::Transpose(i32::MAX),
        },
        at(0.0),
    );
    let orb = world.add_node(NodeKind::sound(7), at(50.0));
    world.connect(setter, orb, ConnectionKind::Plain).unwrap();

    world.inject(setter, PulseEnvelope::default());
    world.settle();

    assert_eq!(world.tuning().transpose, i32::MAX);
    assert_eq!(recorder.emissions_for(orb).unwrap()[0].note, Some(127));
}

#[test]
fn portal_switches_view_and_reenters_on_the_receiver() {
    let (mut world, recorder) = world();
    let receiver = world.add_node_in_view(NodeKind::PortalReceive, at(0.0), 2);
    let orb = world.add_node_in_view(NodeKind::sound(0), at(50.0), 2);
    world.connect(receiver, orb, ConnectionKind::Plain).unwrap();
    let portal = world.add_node(
        NodeKind::PortalSend {
            receiver: Some(receiver),
            view: None,
        },
        at(0.0),
    );

    let wave = world.inject(portal, PulseEnvelope::default());
    world.settle();

    assert_eq!(world.active_view(), 2);
    let emissions = recorder.emissions_for(orb).unwrap();
    assert_eq!(emissions.len(), 1);
    assert_ne!(emissions[0].wave, Some(wave));
    assert!(recorder
        .events()
        .unwrap()
        .iter()
        .any(|event| matches!(event, TraceEvent::View { view: 2, .. })));
}

#[test]
fn toggle_sources_flip_on_external_pulses() {
    let (mut world, _recorder) = world();
    let relay = world.add_node(NodeKind::Relay, at(0.0));
    let toggle = world.add_node(
        NodeKind::Source(SourceParams::pulsar(0.25).with_style(SourceStyle::Toggle)),
        at(100.0),
    );
    world.set_enabled(toggle, false).unwrap();
    world.connect(relay, toggle, ConnectionKind::Plain).unwrap();

    world.inject(relay, PulseEnvelope::default());
    world.settle();
    let node = world.graph().node(toggle).unwrap();
    assert!(node.enabled);
    assert_eq!(node.clock.last_fire_time, Some(0.5));

    world.inject(relay, PulseEnvelope::default());
    world.settle();
    assert!(!world.graph().node(toggle).unwrap().enabled);
}

#[test]
fn drones_light_up_but_stay_terminal() {
    let (mut world, recorder) = world();
    let relay = world.add_node(NodeKind::Relay, at(0.0));
    let drone = world.add_node(NodeKind::Drone { scale_index: 0 }, at(50.0));
    world.connect(relay, drone, ConnectionKind::Plain).unwrap();

    world.inject(relay, PulseEnvelope::default());
    world.settle();
    assert!(recorder.hops().unwrap().is_empty());

    let wave = world.next_wave_id();
    world.propagate(
        drone,
        0.5,
        wave,
        None,
        HopBudget::Unbounded,
        PulseEnvelope::default(),
        None,
    );
    assert_eq!(world.pending_events(), 0);
    assert!(world.graph().node(drone).unwrap().glow > 0.0);
    assert_eq!(activations(&recorder, drone).len(), 1);
}

#[test]
fn glide_connections_carry_the_sender_pitch() {
    let (mut world, recorder) = world();
    let low = world.add_node(NodeKind::sound(0), at(0.0));
    let high = world.add_node(NodeKind::sound(4), at(50.0));
    world
        .connect(low, high, ConnectionKind::Glide { duration: 0.2 })
        .unwrap();

    world.inject(low, PulseEnvelope::default());
    world.settle();

    let emission = &recorder.emissions_for(high).unwrap()[0];
    assert_eq!(
        emission.glide,
        Some(Glide {
            from_note: 60,
            duration: 0.2,
        })
    );
    assert_eq!(recorder.emissions_for(low).unwrap()[0].glide, None);
}

#[test]
fn strings_sound_as_pulses_depart() {
    let (mut world, recorder) = world();
    let relay = world.add_node(NodeKind::Relay, at(0.0));
    let orb = world.add_node(NodeKind::sound(0), at(100.0));
    let string = world
        .connect(
            relay,
            orb,
            ConnectionKind::String {
                scale_index: 3,
                volume: 0.5,
            },
        )
        .unwrap();
    let rope_end = world.add_node(NodeKind::sound(0), Vec2::new(0.0, 100.0));
    world.connect(relay, rope_end, ConnectionKind::Rope).unwrap();

    world.inject(relay, PulseEnvelope::default());
    world.settle();

    let emissions = recorder.emissions().unwrap();
    let plucked: Vec<_> = emissions
        .iter()
        .filter(|emission| emission.target == EmitTarget::Connection(string))
        .collect();
    assert_eq!(plucked.len(), 1);
    assert_close(plucked[0].time_seconds, 0.0);
    assert_eq!(plucked[0].note, Some(world.tuning().note_for(3)));
    assert_eq!(recorder.emissions_for(orb).unwrap().len(), 1);
    assert!(recorder.emissions_for(rope_end).unwrap().is_empty());
}

#[test]
fn one_way_connections_only_carry_forwards() {
    let (mut world, recorder) = world();
    let a = world.add_node(NodeKind::sound(0), at(0.0));
    let b = world.add_node(NodeKind::sound(2), at(50.0));
    world.connect(a, b, ConnectionKind::OneWay).unwrap();

    world.inject(b, PulseEnvelope::default());
    world.settle();
    assert!(recorder.emissions_for(a).unwrap().is_empty());

    world.inject(a, PulseEnvelope::default());
    world.settle();
    assert_eq!(recorder.emissions_for(b).unwrap().len(), 2);
}

#[test]
fn launched_projectiles_trigger_what_they_hit() {
    let (mut world, recorder) = world();
    let launcher = world.add_node(
        NodeKind::Source(SourceParams::pulsar(0.25).with_style(SourceStyle::Launcher)),
        at(0.0),
    );
    let orb = world.add_node(NodeKind::sound(0), at(100.0));

    world.run_until(0.3);
    assert_eq!(world.projectiles().len(), 1);

    world.run_until(0.7);
    let emissions = recorder.emissions_for(orb).unwrap();
    assert_eq!(emissions.len(), 1);
    assert!(emissions[0].time_seconds > 0.5 && emissions[0].time_seconds < 0.7);
    assert!(recorder.events().unwrap().iter().any(|event| matches!(
        event,
        TraceEvent::Projectile { origin, .. } if *origin == launcher
    )));
}

fn fire_upwards_at(world: &mut World, x: f32) {
    let launcher = world.add_node(NodeKind::Relay, Vec2::new(x, -100.0));
    world.launch_projectile(
        launcher,
        std::f32::consts::FRAC_PI_2,
        PulseEnvelope::default(),
        HopBudget::Unbounded,
        0.0,
    );
}

fn approx(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 1e-3
}

#[test]
fn projectile_hitting_a_connection_splits_toward_both_ends() {
    let (mut world, recorder) = world();
    let a = world.add_node(NodeKind::sound(0), at(0.0));
    let b = world.add_node(NodeKind::sound(2), at(200.0));
    world.connect(a, b, ConnectionKind::Plain).unwrap();
    fire_upwards_at(&mut world, 50.0);

    world.run_until(1.0);
    world.settle();

    let near = recorder.emissions_for(a).unwrap();
    let far = recorder.emissions_for(b).unwrap();
    assert_eq!((near.len(), far.len()), (1, 1));
    let gap = far[0].time_seconds - near[0].time_seconds;
    assert!(approx(gap, 0.5), "gap {gap}");
    assert!(world.projectiles().is_empty());
}

#[test]
fn projectile_on_a_one_way_string_only_reaches_the_far_end() {
    let (mut world, recorder) = world();
    let a = world.add_node(NodeKind::sound(0), at(0.0));
    let b = world.add_node(NodeKind::sound(2), at(200.0));
    let string = world
        .connect_with(
            a,
            b,
            ConnectionKind::String {
                scale_index: 4,
                volume: 0.8,
            },
            ConnectOptions::directional(),
        )
        .unwrap();
    fire_upwards_at(&mut world, 50.0);

    world.run_until(1.0);
    world.settle();

    assert!(recorder.emissions_for(a).unwrap().is_empty());
    let far = recorder.emissions_for(b).unwrap();
    assert_eq!(far.len(), 1);

    let emissions = recorder.emissions().unwrap();
    let plucked: Vec<_> = emissions
        .iter()
        .filter(|emission| emission.target == EmitTarget::Connection(string))
        .collect();
    assert_eq!(plucked.len(), 1);
    let travel = far[0].time_seconds - plucked[0].time_seconds;
    assert!(approx(travel, 0.75), "travel {travel}");
}

#[test]
fn reflector_bounces_a_projectile_impact_back() {
    let (mut world, recorder) = world();
    let relay = world.add_node(NodeKind::Relay, at(0.0));
    let mirror = world.add_node(NodeKind::Reflector, at(200.0));
    world.connect(relay, mirror, ConnectionKind::Plain).unwrap();
    fire_upwards_at(&mut world, 50.0);

    world.run_until(1.0);
    world.settle();

    let hops = recorder.hops().unwrap();
    let reflected: Vec<_> = hops.iter().filter(|hop| hop.origin == mirror).collect();
    assert_eq!(reflected.len(), 1);
    assert_eq!(reflected[0].target, relay);

    let impact_wave = hops
        .iter()
        .find(|hop| hop.origin == relay)
        .map(|hop| hop.wave)
        .unwrap();
    assert_ne!(reflected[0].wave, impact_wave);
    assert_eq!(world.last_wave(relay), Some(reflected[0].wave));
}

#[test]
fn glow_decays_between_ticks() {
    let (mut world, _recorder) = world();
    let orb = world.add_node(NodeKind::sound(0), at(0.0));
    world.inject(orb, PulseEnvelope::default());
    world.tick();
    let lit = world.graph().node(orb).unwrap().glow;
    assert!(lit > 0.0);

    world.run_until(1.0);
    assert_eq!(world.graph().node(orb).unwrap().glow, 0.0);
}
