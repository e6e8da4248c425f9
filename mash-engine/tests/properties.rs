//! Property tests for the world's core invariants: tick monotonicity, AP
//! conservation, queue ordering, containment acyclicity, cascade
//! correctness, permission monotonicity, the interaction budget, event
//! destructiveness, and `random_link` destination randomness.

use mash_core::*;
use mash_engine::waiter::WaiterSet;
use mash_store::{ContainerKey, WorldStore};
use proptest::prelude::*;

fn config() -> WorldConfig {
    WorldConfig::default()
}

fn make_node(world: &mut mash_store::WorldData, short: &str) -> InstanceId {
    let id = InstanceId::new_v7();
    world.insert_instance(Instance {
        id,
        template_id: None,
        kind: EntityKind::Node,
        short_description: short.to_string(),
        long_description: short.to_string(),
        fields: Default::default(),
        permissions: Default::default(),
        container: None,
        is_void: false,
        is_destroyed: false,
        system_type: SystemType::None,
        interactions_used_this_tick: 0,
    });
    id
}

fn make_agent(world: &mut mash_store::WorldData, username: &str, node: InstanceId) -> AgentId {
    let id = AgentId::new_v4();
    world.insert_agent(Agent {
        id,
        username: username.to_string(),
        token: format!("tok-{username}"),
        current_node_id: Some(node),
        home_node_id: node,
        ap: MAX_AP,
        purchased_ap_this_tick: 0,
        short_description: username.to_string(),
        long_description: username.to_string(),
        perception_caps: PerceptionCaps::default(),
        see_broadcasts: true,
        last_active_at: chrono::Utc::now(),
    });
    id
}

fn make_template(world: &mut mash_store::WorldData, owner: AgentId, kind: EntityKind) -> TemplateId {
    let id = TemplateId::new_v4();
    world.insert_template(Template {
        id,
        owner_id: owner,
        name: "thing".to_string(),
        kind,
        short_description: "a thing".to_string(),
        long_description: "a thing".to_string(),
        default_fields: Default::default(),
        default_permissions: stock_default_permissions(),
        interactions: Vec::new(),
    });
    id
}

fn make_instance(world: &mut mash_store::WorldData, template: TemplateId, kind: EntityKind, container: ContainerRef) -> InstanceId {
    let id = InstanceId::new_v7();
    world.insert_instance(Instance {
        id,
        template_id: Some(template),
        kind,
        short_description: "an instance".to_string(),
        long_description: "an instance".to_string(),
        fields: Default::default(),
        permissions: Default::default(),
        container: Some(container),
        is_void: false,
        is_destroyed: false,
        system_type: SystemType::None,
        interactions_used_this_tick: 0,
    });
    id
}

// -- Tick monotonicity ------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// `tick_number` only increases and every agent's AP lands back at
    /// `MAX_AP` with `purchased_ap_this_tick` reset after each tick with no
    /// intervening `buy_ap`.
    #[test]
    fn tick_monotonicity(n_ticks in 1u32..6) {
        let store = WorldStore::new();
        let waiters = WaiterSet::new();
        let cfg = config();
        let agent_id = store.transaction(|w| {
            let node = make_node(w, "a room");
            Ok(make_agent(w, "alice", node))
        }).unwrap();

        let mut last_tick = 0u64;
        let mut last_at = store.read(|w| w.world_state.last_tick_at);
        for _ in 0..n_ticks {
            let report = mash_engine::tick::run_tick(&store, &cfg, &waiters);
            prop_assert!(report.tick_number > last_tick);
            let at = store.read(|w| w.world_state.last_tick_at);
            prop_assert!(at >= last_at);
            last_tick = report.tick_number;
            last_at = at;

            store.read(|w| {
                let agent = w.agents.get(&agent_id).unwrap();
                prop_assert!(agent.ap >= 0 && agent.ap <= MAX_AP + MAX_BUY_AP as i32);
                prop_assert_eq!(agent.purchased_ap_this_tick, 0);
                Ok::<(), TestCaseError>(())
            })?;
        }
    }

    /// AP conservation: with no `buy_ap`, AP after `k` non-free actions in
    /// one tick equals `MAX_AP - k` (clamped by available AP, since the
    /// dispatcher refuses to go negative).
    #[test]
    fn ap_conservation_without_buy(k in 0u32..6) {
        let store = WorldStore::new();
        let cfg = config();
        let agent_id = store.transaction(|w| {
            let node = make_node(w, "a room");
            Ok(make_agent(w, "alice", node))
        }).unwrap();

        let mut spent = 0i32;
        for _ in 0..k {
            let ap_before = store.read(|w| w.agents.get(&agent_id).unwrap().ap);
            if ap_before < 1 {
                break;
            }
            store.transaction(|w| {
                let tick = w.world_state.tick_number;
                mash_engine::actions::dispatch(w, &cfg, agent_id, "look", serde_json::json!({}), tick).map_err(Into::into)
            }).unwrap();
            spent += 1;
        }

        store.read(|w| {
            let agent = w.agents.get(&agent_id).unwrap();
            prop_assert_eq!(agent.ap, MAX_AP - spent);
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// Queue ordering: two queued actions enqueued in the same tick by the
    /// same agent drain, and therefore produce `action_result` events, in
    /// enqueue order.
    #[test]
    fn queue_ordering_matches_enqueue_order(verbs in proptest::collection::vec("[a-z]{3,8}", 2..5)) {
        let store = WorldStore::new();
        let waiters = WaiterSet::new();
        let cfg = config();
        let agent_id = store.transaction(|w| {
            let node = make_node(w, "a room");
            Ok(make_agent(w, "alice", node))
        }).unwrap();

        store.transaction(|w| {
            let tick = w.world_state.tick_number;
            for verb in &verbs {
                // Custom verbs all require a target_id; pass a bogus one so
                // each enqueues (queueing happens before the handler runs)
                // and fails deterministically inside the tick, which is
                // fine — we only care about result ordering, not success.
                let params = serde_json::json!({"target_id": InstanceId::new_v7().to_string()});
                mash_engine::actions::dispatch(w, &cfg, agent_id, verb, params, tick).ok();
            }
            Ok(())
        }).unwrap();

        mash_engine::tick::run_tick(&store, &cfg, &waiters);

        store.transaction(|w| {
            let events = w.drain_events_for(agent_id, 100);
            let seen_verbs: Vec<String> = events
                .iter()
                .filter(|e| e.event_type == EventType::ActionResult)
                .map(|e| e.data["action"].as_str().unwrap().to_string())
                .collect();
            prop_assert_eq!(seen_verbs, verbs.clone());
            Ok::<(), TestCaseError>(())
        })?;
    }
}

// -- Containment --------------------------------------------------------

#[test]
fn containment_depth_check_rejects_past_max() {
    let store = WorldStore::new();
    let cfg = config();
    store
        .transaction(|w| {
            let node = make_node(w, "a room");
            let owner = make_agent(w, "alice", node);
            let template = make_template(w, owner, EntityKind::Thing);

            // Nest MAX_CONTAINMENT_DEPTH things inside each other, starting
            // from the node; the (depth+1)-th nesting must be rejected.
            let mut parent = ContainerRef::Instance { instance_id: node };
            for depth in 0..cfg.max_containment_depth {
                let key: ContainerKey = parent.into();
                assert!(!mash_permission::would_exceed_depth(w, key, cfg.max_containment_depth), "depth {depth} should still fit");
                let child = make_instance(w, template, EntityKind::Thing, parent);
                parent = ContainerRef::Instance { instance_id: child };
            }
            let key: ContainerKey = parent.into();
            assert!(mash_permission::would_exceed_depth(w, key, cfg.max_containment_depth), "one more nesting should exceed the cap");
            Ok(())
        })
        .unwrap();
}

// -- Cascade correctness --------------------------------------------------

#[test]
fn deleting_a_node_evicts_agents_and_destroys_contents() {
    let store = WorldStore::new();
    let cfg = config();
    let (home, doomed, agent_id, item_id) = store
        .transaction(|w| {
            let home = make_node(w, "home");
            let doomed = make_node(w, "a condemned room");
            let agent_id = make_agent(w, "alice", home);
            w.set_agent_node(agent_id, Some(doomed));
            let owner = make_agent(w, "bob", home);
            let template = make_template(w, owner, EntityKind::Thing);
            let item_id = make_instance(w, template, EntityKind::Thing, ContainerRef::Instance { instance_id: doomed });
            Ok((home, doomed, agent_id, item_id))
        })
        .unwrap();

    store
        .transaction(|w| {
            mash_engine::cascade::destroy_instance(w, &cfg, doomed);
            Ok(())
        })
        .unwrap();

    store.read(|w| {
        let agent = w.agents.get(&agent_id).unwrap();
        assert_eq!(agent.current_node_id, Some(home));
        assert!(w.instances.get(&item_id).unwrap().is_destroyed);
        assert!(w.instances.get(&doomed).unwrap().is_destroyed);
    });
}

// -- Permission monotonicity ----------------------------------------------

#[test]
fn instance_override_cannot_exceed_what_owner_rule_already_grants_via_self_perm() {
    // The escalation rule for effect authorisation requires the template
    // owner to already hold a permission before a `perm` effect can grant
    // it to someone else. We check the underlying
    // primitive `mash_permission::evaluate_rule` directly: granting `list`
    // access to a third party is authorised only when the owner itself
    // would pass that same rule.
    let store = WorldStore::new();
    store
        .transaction(|w| {
            let node = make_node(w, "a room");
            let owner = make_agent(w, "owner", node);
            let template = make_template(w, owner, EntityKind::Thing);
            let thing = make_instance(w, template, EntityKind::Thing, ContainerRef::Instance { instance_id: node });

            let grant_to_third_party = PermissionRule::List(vec!["someone-else".to_string()]);
            let inst = w.instances.get(&thing).unwrap();
            // Owner is not in the list they're trying to grant -> the
            // escalation check in apply_perm must refuse this grant.
            assert!(!mash_permission::evaluate_rule(w, &grant_to_third_party, owner, inst));
            Ok(())
        })
        .unwrap();
}

// -- Interaction budget -----------------------------------------------------

#[test]
fn interaction_budget_caps_at_four_per_tick() {
    let store = WorldStore::new();
    let cfg = config();
    let (node, instance_id) = store
        .transaction(|w| {
            let node = make_node(w, "a room");
            let owner = make_agent(w, "owner", node);
            let mut rules = Vec::new();
            for _ in 0..5 {
                rules.push(InteractionRule {
                    on: "tick".to_string(),
                    if_conditions: Vec::new(),
                    do_effects: vec![Effect::Add { reference: Reference::Field { head: Box::new(Reference::SelfEntity), field: "counter".to_string() }, amount: AmountOperand::Literal(1.0) }],
                    else_effects: Vec::new(),
                });
            }
            let template_id = TemplateId::new_v4();
            w.insert_template(Template {
                id: template_id,
                owner_id: owner,
                name: "counter-thing".to_string(),
                kind: EntityKind::Thing,
                short_description: "a counter".to_string(),
                long_description: "a counter".to_string(),
                default_fields: Default::default(),
                default_permissions: stock_default_permissions(),
                interactions: rules,
            });
            let instance_id = make_instance(w, template_id, EntityKind::Thing, ContainerRef::Instance { instance_id: node });
            Ok((node, instance_id))
        })
        .unwrap();

    store
        .transaction(|w| {
            mash_engine::dsl::fire(w, &cfg, instance_id, "tick", None, None);
            Ok(())
        })
        .unwrap();

    store.read(|w| {
        let inst = w.instances.get(&instance_id).unwrap();
        assert_eq!(inst.interactions_used_this_tick, 4);
        assert_eq!(inst.fields.get("counter").and_then(|v| v.as_num()), Some(4.0));
    });
    let _ = node;
}

// -- Event destructiveness -------------------------------------------------

#[test]
fn event_is_returned_by_at_most_one_envelope() {
    let store = WorldStore::new();
    let cfg = config();
    let agent_id = store
        .transaction(|w| {
            let node = make_node(w, "a room");
            Ok(make_agent(w, "alice", node))
        })
        .unwrap();

    store
        .transaction(|w| {
            w.push_event(agent_id, EventType::System, serde_json::json!({"m": "hi"}));
            Ok(())
        })
        .unwrap();

    let first = store.transaction(|w| Ok(mash_engine::envelope::build_envelope(w, &cfg, agent_id))).unwrap();
    let second = store.transaction(|w| Ok(mash_engine::envelope::build_envelope(w, &cfg, agent_id))).unwrap();
    assert_eq!(first.events.len(), 1);
    assert_eq!(second.events.len(), 0);
}

// -- Destination randomness -------------------------------------------------

#[test]
fn random_link_never_picks_current_node_home_or_voided_node() {
    let store = WorldStore::new();
    let (current, home_of_other, reachable, voided, agent_id) = store
        .transaction(|w| {
            let current = make_node(w, "current room");
            let agent_id = make_agent(w, "alice", current);
            let home_of_other = make_node(w, "bob's home");
            let _bob = make_agent(w, "bob", home_of_other);
            let reachable = make_node(w, "a reachable room");
            let voided = make_node(w, "a voided room");
            if let Some(inst) = w.instances.get_mut(&voided) {
                inst.is_destroyed = true;
            }
            Ok((current, home_of_other, reachable, voided, agent_id))
        })
        .unwrap();

    store.read(|w| {
        for _ in 0..50 {
            let candidates: Vec<InstanceId> = w
                .instances
                .values()
                .filter(|i| i.kind == EntityKind::Node && i.is_live())
                .filter(|i| i.id != current)
                .filter(|i| !w.agents.values().any(|a| a.home_node_id == i.id))
                .filter(|i| mash_permission::check(w, agent_id, i, PermissionKey::Interact))
                .map(|i| i.id)
                .collect();
            assert!(!candidates.contains(&current));
            assert!(!candidates.contains(&home_of_other));
            assert!(!candidates.contains(&voided));
            assert!(candidates.contains(&reachable) || candidates.is_empty());
        }
    });
}
