//! Graph queries over hand-built knowledge graphs, plus randomized
//! structural properties.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scholia::extraction::IsAHint;
use scholia::hierarchy::HierarchyBuilder;
use scholia::{
    CancellationToken, Concept, ConceptHierarchy, ConceptId, ConceptRelationship, Direction,
    KnowledgeGraph, OrderQuery, ParentAssignment, PathQuery, RankQuery, RelationshipKind,
    ScholiaError,
};

fn id(name: &str) -> ConceptId {
    ConceptId::from_name(name)
}

fn graph_of(edges: &[(&str, &str, f64)]) -> KnowledgeGraph {
    let mut graph = KnowledgeGraph::new();
    for (from, to, _) in edges {
        graph.add_concept(id(from));
        graph.add_concept(id(to));
    }
    for (from, to, strength) in edges {
        graph
            .add_relationship(ConceptRelationship::new(
                id(from),
                id(to),
                RelationshipKind::ParentOf,
                *strength,
            ))
            .unwrap();
    }
    graph
}

/// The introductory-programming chain plus a longer detour
fn curriculum() -> KnowledgeGraph {
    graph_of(&[
        ("variables", "functions", 0.9),
        ("functions", "loops", 0.8),
        ("loops", "algorithms", 0.9),
        ("variables", "types", 0.9),
        ("types", "classes", 0.9),
        ("classes", "objects", 0.9),
        ("objects", "algorithms", 0.9),
    ])
}

#[test]
fn test_shortest_path_follows_the_curriculum_chain() {
    let graph = curriculum();
    let path = graph.shortest_path(id("variables"), id("algorithms"));
    assert_eq!(path, vec![id("variables"), id("functions"), id("loops"), id("algorithms")]);
}

#[test]
fn test_path_respects_direction_and_length() {
    let graph = curriculum();
    assert!(graph.shortest_path(id("algorithms"), id("variables")).is_empty());

    let backwards = PathQuery::between(id("algorithms"), id("variables"))
        .direction(Direction::Incoming)
        .execute(&graph);
    assert_eq!(backwards.len(), 4);

    let short = PathQuery::between(id("variables"), id("algorithms"))
        .max_length(2)
        .execute(&graph);
    assert!(short.is_empty());
}

#[test]
fn test_goal_directed_search_prefers_strong_edges() {
    let graph = graph_of(&[
        ("variables", "functions", 0.1),
        ("functions", "algorithms", 0.1),
        ("variables", "loops", 1.0),
        ("loops", "algorithms", 1.0),
    ]);
    let result = graph
        .goal_directed_search(id("variables"), id("algorithms"), |_| 0.0)
        .unwrap();
    assert_eq!(result.path, vec![id("variables"), id("loops"), id("algorithms")]);
    assert!((result.cost - 2.0).abs() < 1e-9);
}

#[test]
fn test_dependency_order_puts_prerequisites_first() {
    let graph = curriculum();
    let order = graph.dependency_order().unwrap();
    let position = |name: &str| order.iter().position(|c| *c == id(name)).unwrap();
    for relationship in graph.relationships() {
        let from = order.iter().position(|c| *c == relationship.from).unwrap();
        let to = order.iter().position(|c| *c == relationship.to).unwrap();
        assert!(from < to);
    }
    assert_eq!(position("variables"), 0);
}

#[test]
fn test_cyclic_extra_edges_are_reported() {
    let graph = curriculum();
    let err = OrderQuery::hierarchy()
        .with_edges([(id("algorithms"), id("variables"))])
        .execute(&graph)
        .unwrap_err();
    match err {
        ScholiaError::CycleDetected { remaining } => {
            assert!(remaining.contains(&id("variables")));
            assert!(remaining.contains(&id("algorithms")));
        }
        other => panic!("expected a cycle, got {other:?}"),
    }
}

#[test]
fn test_components_split_disconnected_topics() {
    let mut graph = curriculum();
    graph.add_concept(id("photosynthesis"));
    let components = graph.connected_components();
    assert_eq!(components.len(), 2);
    assert!(components.iter().any(|c| c == &vec![id("photosynthesis")]));
}

#[test]
fn test_importance_concentrates_on_the_shared_sink() {
    let graph = curriculum();
    let ranks = graph.importance_ranking(0.85, 100).unwrap();
    assert!((ranks.total() - 1.0).abs() < 1e-9);
    assert_eq!(ranks.top_k(1)[0].0, id("algorithms"));
    assert!(ranks.get(&id("algorithms")) > ranks.get(&id("variables")));
}

#[test]
fn test_random_graphs_rank_to_a_distribution() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..20 {
        let n = rng.gen_range(1..30);
        let names: Vec<String> = (0..n).map(|i| format!("concept {i}")).collect();
        let mut graph = KnowledgeGraph::new();
        for name in &names {
            graph.add_concept(id(name));
        }
        for _ in 0..rng.gen_range(0..(n * 3)) {
            let (a, b) = (rng.gen_range(0..n), rng.gen_range(0..n));
            if a == b {
                continue;
            }
            let kind = RelationshipKind::ALL[rng.gen_range(0..3)];
            let edge = ConceptRelationship::new(id(&names[a]), id(&names[b]), kind, rng.gen());
            // parent-of edges that would close a loop are refused
            if let Err(e) = graph.add_relationship(edge) {
                assert!(matches!(e, ScholiaError::CycleDetected { .. }));
            }
        }

        let ranks = RankQuery::new().execute(&graph, &CancellationToken::new()).unwrap();
        assert_eq!(ranks.scores.len(), n);
        assert!((ranks.total() - 1.0).abs() < 1e-6, "total = {}", ranks.total());
        assert!(ranks.scores.iter().all(|(_, s)| *s >= 0.0));
        assert!(graph.is_consistent());
    }
}

#[test]
fn test_random_parent_assignments_never_form_a_cycle() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..20 {
        let n = rng.gen_range(2..25);
        let concepts: Vec<Concept> = (0..n).map(|i| Concept::new(format!("node {i}"), "concept")).collect();
        let ids: Vec<ConceptId> = concepts.iter().map(|c| c.id).collect();
        let mut hierarchy = ConceptHierarchy::new();
        for concept in concepts {
            hierarchy.insert(concept);
        }

        for _ in 0..(n * 4) {
            let (child, parent) = (ids[rng.gen_range(0..n)], ids[rng.gen_range(0..n)]);
            let before = hierarchy.parent(&child);
            match hierarchy.set_parent(child, parent).unwrap() {
                ParentAssignment::Assigned => assert_eq!(hierarchy.parent(&child), Some(parent)),
                ParentAssignment::Unchanged => assert_eq!(hierarchy.parent(&child), before),
                ParentAssignment::Rejected(_) => assert_eq!(hierarchy.parent(&child), before),
            }
        }

        for concept in &ids {
            let ancestors = hierarchy.ancestors(concept);
            assert!(!ancestors.contains(concept));
            assert!(ancestors.len() < n);
        }
        let metrics = hierarchy.metrics();
        assert_eq!(metrics.concept_count, n);
        assert!(metrics.root_count >= 1);
    }
}

#[test]
fn test_random_candidate_sets_build_an_acyclic_forest() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..30 {
        let n = rng.gen_range(2..20);
        let names: Vec<String> = (0..n).map(|i| format!("topic {i}")).collect();
        let concepts: Vec<Concept> = names
            .iter()
            .map(|name| {
                let mut concept = Concept::new(name.as_str(), "concept");
                if rng.gen_bool(0.8) {
                    concept.embedding = Some((0..3).map(|_| rng.gen_range(-1.0f32..1.0)).collect());
                }
                concept.confidence = rng.gen();
                concept
            })
            .collect();

        let mut hints = Vec::new();
        for _ in 0..rng.gen_range(0..(n * 2)) {
            let (a, b) = (rng.gen_range(0..n), rng.gen_range(0..n));
            hints.push(IsAHint::new(names[a].as_str(), names[b].as_str()));
            match rng.gen_range(0..4) {
                // mutual pair
                0 => hints.push(IsAHint::new(names[b].as_str(), names[a].as_str())),
                // three-way loop
                1 => {
                    let c = rng.gen_range(0..n);
                    hints.push(IsAHint::new(names[b].as_str(), names[c].as_str()));
                    hints.push(IsAHint::new(names[c].as_str(), names[a].as_str()));
                }
                _ => {}
            }
        }

        let threshold = rng.gen_range(0.0..1.0);
        let build = HierarchyBuilder::new(threshold).build(concepts, &hints).unwrap();
        let hierarchy = &build.hierarchy;
        assert_eq!(hierarchy.len(), n);

        for concept in hierarchy.concepts() {
            assert!(!hierarchy.ancestors(&concept.id).contains(&concept.id));
            if let Some(parent) = hierarchy.parent(&concept.id) {
                assert!(build
                    .relationships
                    .iter()
                    .any(|r| r.kind == RelationshipKind::ParentOf && r.from == parent && r.to == concept.id));
            }
        }
        for edge in build.relationships.iter().filter(|r| r.kind == RelationshipKind::ParentOf) {
            assert_eq!(hierarchy.parent(&edge.to), Some(edge.from));
        }

        let mut graph = KnowledgeGraph::new();
        for concept in hierarchy.concepts() {
            graph.add_concept(concept.id);
        }
        for relationship in build.relationships {
            graph.add_relationship(relationship).unwrap();
        }
        assert!(graph.dependency_order().is_ok());
        assert!(graph.is_consistent());
    }
}

#[test]
fn test_cancelled_ranking_stops() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = RankQuery::new().execute(&curriculum(), &cancel);
    assert!(matches!(result, Err(ScholiaError::Cancelled)));
}
