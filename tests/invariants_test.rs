use common::{BOOTSTRAP, H1, H2, H3, OWNER, id, open_diamond, sel};
use diamond_registry::application::diamond::{CUT_SIGNATURE, Diamond};
use diamond_registry::domain::cut::{CutAction, HandlerCut};
use diamond_registry::domain::identity::{Identity, Selector};
use diamond_registry::infrastructure::in_memory::InMemoryStateStore;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, BTreeSet};

mod common;

const UNDEPLOYED: u64 = 404;

type Routes = BTreeMap<Selector, Identity>;

fn universe() -> Vec<Selector> {
    let mut selectors: Vec<Selector> = (0..16).map(|i| sel(&format!("op{i}()"))).collect();
    selectors.push(sel(CUT_SIGNATURE));
    selectors
}

fn random_cut(rng: &mut StdRng, universe: &[Selector]) -> HandlerCut {
    let handlers = [id(H1), id(H2), id(H3), id(UNDEPLOYED)];
    let action = match rng.gen_range(0..3) {
        0 => CutAction::Add,
        1 => CutAction::Replace,
        _ => CutAction::Remove,
    };
    let handler = match action {
        CutAction::Remove if rng.gen_bool(0.9) => Identity::NONE,
        _ => handlers[rng.gen_range(0..handlers.len())],
    };
    let count = rng.gen_range(0..4);
    let selectors = (0..count)
        .map(|_| universe[rng.gen_range(0..universe.len())])
        .collect();
    HandlerCut {
        handler,
        action,
        selectors,
    }
}

/// Reference semantics over a flat selector -> handler map. `None` means the
/// batch must be rejected.
fn simulate(routes: &Routes, cuts: &[HandlerCut]) -> Option<Routes> {
    let deployed = |h: &Identity| [id(H1), id(H2), id(H3)].contains(h);
    let bootstrap = sel(CUT_SIGNATURE);
    let mut next = routes.clone();

    for cut in cuts {
        if cut.selectors.is_empty() {
            return None;
        }
        match cut.action {
            CutAction::Add => {
                if !deployed(&cut.handler) {
                    return None;
                }
                for s in &cut.selectors {
                    if next.insert(*s, cut.handler).is_some() {
                        return None;
                    }
                }
            }
            CutAction::Replace => {
                if !deployed(&cut.handler) {
                    return None;
                }
                for s in &cut.selectors {
                    if *s == bootstrap {
                        return None;
                    }
                    match next.get(s) {
                        Some(current) if *current != cut.handler => {
                            next.insert(*s, cut.handler);
                        }
                        _ => return None,
                    }
                }
            }
            CutAction::Remove => {
                if !cut.handler.is_none() {
                    return None;
                }
                for s in &cut.selectors {
                    if *s == bootstrap || next.remove(s).is_none() {
                        return None;
                    }
                }
            }
        }
    }
    Some(next)
}

fn observed_routes(diamond: &Diamond) -> Routes {
    diamond
        .facets()
        .into_iter()
        .flat_map(|facet| {
            facet
                .selectors
                .into_iter()
                .map(move |selector| (selector, facet.handler))
        })
        .collect()
}

async fn run_random_sequence(seed: u64, batches: usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let universe = universe();
    let mut diamond = open_diamond(InMemoryStateStore::new()).await;
    let mut model: Routes = BTreeMap::from([(sel(CUT_SIGNATURE), id(BOOTSTRAP))]);
    let mut applied = 0;

    for _ in 0..batches {
        let cuts: Vec<HandlerCut> = (0..rng.gen_range(1..4))
            .map(|_| random_cut(&mut rng, &universe))
            .collect();
        let expected = simulate(&model, &cuts);
        let before = serde_json::to_vec(diamond.state()).unwrap();

        let result = diamond.cut(id(OWNER), cuts.clone(), None).await;

        match expected {
            Some(next) => {
                assert!(result.is_ok(), "seed {seed}: {cuts:?} rejected: {result:?}");
                model = next;
                applied += 1;
            }
            None => {
                assert!(result.is_err(), "seed {seed}: {cuts:?} should have failed");
                assert_eq!(serde_json::to_vec(diamond.state()).unwrap(), before);
            }
        }

        diamond.state().registry.check_invariants().unwrap();
        assert_eq!(observed_routes(&diamond), model);
        for selector in &universe {
            assert_eq!(diamond.handler_of(*selector), model.get(selector).copied());
        }

        let listed: BTreeSet<Identity> = diamond.handlers().iter().copied().collect();
        let expected_handlers: BTreeSet<Identity> = model.values().copied().collect();
        assert_eq!(listed, expected_handlers);
        assert_eq!(listed.len(), diamond.handlers().len(), "duplicate handler listed");
    }

    assert_eq!(diamond.cut_log().len(), applied);
}

#[tokio::test]
async fn test_random_cut_sequences_preserve_invariants() {
    for seed in [1, 7, 42, 1337, 9001] {
        run_random_sequence(seed, 250).await;
    }
}

#[tokio::test]
async fn test_unmapped_selector_fails_for_any_payload() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut diamond = open_diamond(InMemoryStateStore::new()).await;
    diamond
        .cut(id(OWNER), vec![HandlerCut::add(id(H1), vec![sel("bound()")])], None)
        .await
        .unwrap();

    for _ in 0..100 {
        let len = rng.gen_range(0..64);
        let payload: Vec<u8> = (0..len).map(|_| rng.r#gen()).collect();
        let calldata = sel("unbound()").encode_call(&payload);
        assert!(matches!(
            diamond.call(id(5), &calldata).await,
            Err(diamond_registry::error::RegistryError::UnknownSelector(_))
        ));
    }
}
