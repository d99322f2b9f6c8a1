mod support;

use seqfeat_core::{
    ChildInput, ChildRef, FeatureNode, FeatureOptions, FeatureRecord, FeatureStore, NodeError,
    SeqFeature, Strand, StoreOptions,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::rc::Rc;
use support::{counting_store, sqlite_store};

fn persisted_mrna(store: &Rc<dyn FeatureStore>, start: i64, end: i64) -> FeatureNode {
    let options = FeatureOptions {
        subtype: Some("exon".to_string()),
        ..FeatureOptions::with_record(FeatureRecord::new("chr1", "mRNA", start, end))
    };
    FeatureNode::new(options, Some(store)).unwrap()
}

#[test]
fn inverted_pair_becomes_reverse_strand_child() {
    let store = sqlite_store();
    let mut mrna = persisted_mrna(&store, 1, 100);

    mrna.add_seq_feature([ChildInput::range(20, 10)]).unwrap();

    let exons = mrna.get_seq_features(&["exon"]).unwrap();
    assert_eq!(exons.len(), 1);
    assert_eq!((exons[0].start(), exons[0].end()), (Some(10), Some(20)));
    assert_eq!(exons[0].strand(), Strand::Reverse);
    assert_eq!(exons[0].seq_id(), Some("chr1"));
    assert!(exons[0].primary_id().is_some());
}

#[test]
fn pair_children_inherit_parent_source_and_name() {
    let store = sqlite_store();
    let mut record = FeatureRecord::new("chr2", "mRNA", 1, 100);
    record.source_tag = Some("refseq".to_string());
    record.display_name = Some("NM_1".to_string());
    record.strand = Strand::Forward;
    let mut mrna = FeatureNode::new(FeatureOptions::with_record(record), Some(&store)).unwrap();

    mrna.add_seq_feature([ChildInput::range(5, 15)]).unwrap();

    // Without a subtype the child takes the parent's type.
    let children = mrna.get_seq_features(&["mrna:refseq"]).unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].display_name(), Some("NM_1"));
    assert_eq!(children[0].strand(), Strand::Forward);
}

#[test]
fn bounds_grow_across_additions_and_are_written_back() {
    let store = sqlite_store();
    let mut mrna = persisted_mrna(&store, 50, 60);

    mrna.add_seq_feature([ChildInput::range(10, 20)]).unwrap();
    assert_eq!((mrna.start(), mrna.end()), (Some(10), Some(60)));

    mrna.add_seq_feature([ChildInput::range(70, 80)]).unwrap();
    assert_eq!((mrna.start(), mrna.end()), (Some(10), Some(80)));

    let reloaded = FeatureNode::load(&store, mrna.primary_id().unwrap()).unwrap();
    assert_eq!((reloaded.start(), reloaded.end()), (Some(10), Some(80)));
    assert_eq!(reloaded.children().len(), 2);
}

#[test]
fn reference_and_strand_come_from_first_child_only() {
    let store = sqlite_store();
    let options = FeatureOptions::with_record(FeatureRecord {
        primary_tag: Some("gene".to_string()),
        ..FeatureRecord::default()
    });
    let mut gene = FeatureNode::new(options, Some(&store)).unwrap();

    let mut first = FeatureRecord::new("chr3", "mRNA", 300, 400);
    first.strand = Strand::Reverse;
    let mut second = FeatureRecord::new("chr9", "mRNA", 100, 150);
    second.strand = Strand::Forward;
    gene.add_seq_feature([first, second]).unwrap();

    assert_eq!(gene.seq_id(), Some("chr3"));
    assert_eq!(gene.strand(), Strand::Reverse);
    assert_eq!((gene.start(), gene.end()), (Some(100), Some(400)));

    let mut later = FeatureRecord::new("chr12", "mRNA", 50, 60);
    later.strand = Strand::Forward;
    gene.add_seq_feature([later]).unwrap();
    assert_eq!(gene.seq_id(), Some("chr3"));
    assert_eq!(gene.strand(), Strand::Reverse);
    assert_eq!((gene.start(), gene.end()), (Some(50), Some(400)));
}

#[test]
fn children_are_written_in_one_batch() {
    let (counter, store) = counting_store(StoreOptions::default());
    let mut mrna = persisted_mrna(&store, 1, 100);
    assert_eq!(counter.store_calls.get(), 1);

    mrna.add_seq_feature([
        ChildInput::range(1, 10),
        ChildInput::range(20, 30),
        ChildInput::range(40, 50),
    ])
    .unwrap();

    // One batch for the children plus the parent write-back.
    assert_eq!(counter.store_calls.get(), 3);
    assert_eq!(counter.stored_nodes.get(), 1 + 3 + 1);
    assert_eq!(mrna.children().len(), 3);
    assert!(mrna.children().iter().all(|child| child.store_id().is_some()));
}

#[test]
fn store_policy_can_keep_children_out_of_the_index() {
    let (counter, store) = counting_store(StoreOptions {
        index_subfeatures: false,
    });
    let mut mrna = persisted_mrna(&store, 1, 100);

    mrna.add_seq_feature([ChildInput::range(1, 10), ChildInput::range(20, 30)]).unwrap();

    assert_eq!(counter.noindex_calls.get(), 1);
    let child_id = mrna.children()[0].store_id().unwrap();
    assert_eq!(counter.inner().is_indexed(child_id).unwrap(), Some(false));
    assert_eq!(
        counter.inner().is_indexed(mrna.primary_id().unwrap()).unwrap(),
        Some(true)
    );
}

#[test]
fn normalized_addition_without_store_fails_and_changes_nothing() {
    let mut mrna = FeatureNode::from_record(FeatureRecord::new("chr1", "mRNA", 50, 60));

    let err = mrna.add_seq_feature([ChildInput::range(10, 20)]).unwrap_err();

    assert!(matches!(err, NodeError::Configuration(_)));
    assert!(mrna.children().is_empty());
    assert_eq!((mrna.start(), mrna.end()), (Some(50), Some(60)));
}

#[test]
fn normalized_addition_after_store_drop_is_a_configuration_error() {
    let store = sqlite_store();
    let mut mrna = persisted_mrna(&store, 1, 100);
    drop(store);

    assert!(mrna.object_store().is_none());
    let err = mrna.add_seq_feature([ChildInput::range(10, 20)]).unwrap_err();
    assert!(matches!(err, NodeError::Configuration(_)));
    assert!(mrna.children().is_empty());
}

#[test]
fn failed_batch_write_leaves_node_unchanged() {
    let (counter, store) = counting_store(StoreOptions::default());
    let mut mrna = persisted_mrna(&store, 50, 60);
    counter.fail_writes.set(true);

    let err = mrna
        .add_seq_feature([ChildInput::range(10, 20), ChildInput::range(70, 80)])
        .unwrap_err();

    assert!(matches!(err, NodeError::StoreWrite(_)));
    assert!(mrna.children().is_empty());
    assert_eq!((mrna.start(), mrna.end()), (Some(50), Some(60)));
}

#[test]
fn failed_write_back_restores_bounds_and_children() {
    let (counter, store) = counting_store(StoreOptions::default());
    let mut mrna = persisted_mrna(&store, 50, 60);
    // Call 2 is the child batch; call 3 the parent write-back.
    counter.fail_writes_from.set(Some(3));

    let err = mrna
        .add_seq_feature([ChildInput::range(10, 20), ChildInput::range(70, 80)])
        .unwrap_err();

    assert!(matches!(err, NodeError::StoreWrite(_)));
    assert_eq!(counter.store_calls.get(), 3);
    assert!(mrna.children().is_empty());
    assert_eq!((mrna.start(), mrna.end()), (Some(50), Some(60)));

    let reloaded = FeatureNode::load(&store, mrna.primary_id().unwrap()).unwrap();
    assert!(reloaded.children().is_empty());
    assert_eq!((reloaded.start(), reloaded.end()), (Some(50), Some(60)));

    counter.fail_writes_from.set(None);
    mrna.add_seq_feature([ChildInput::range(10, 20)]).unwrap();
    assert_eq!(mrna.children().len(), 1);
    assert_eq!((mrna.start(), mrna.end()), (Some(10), Some(60)));
}

#[test]
fn failed_write_back_of_embedded_addition_restores_node() {
    let (counter, store) = counting_store(StoreOptions::default());
    let mut mrna = persisted_mrna(&store, 50, 60);
    mrna.add_segment([ChildInput::range(55, 58)]).unwrap();
    counter.fail_writes_from.set(Some(3));

    let err = mrna.add_segment([ChildInput::range(90, 120)]).unwrap_err();

    assert!(matches!(err, NodeError::StoreWrite(_)));
    assert_eq!(mrna.children().len(), 1);
    assert_eq!((mrna.start(), mrna.end()), (Some(50), Some(60)));
}

#[test]
fn missing_identifiers_after_write_are_reported() {
    let (counter, store) = counting_store(StoreOptions::default());
    let mut mrna = persisted_mrna(&store, 1, 100);
    counter.withhold_ids.set(true);

    let err = mrna.add_seq_feature([ChildInput::range(10, 20)]).unwrap_err();

    assert!(matches!(err, NodeError::NoIdentity { position: 0 }));
    assert!(mrna.children().is_empty());
}

#[test]
fn embedded_children_drop_their_store_identity() {
    let store = sqlite_store();
    let exon = FeatureNode::new(
        FeatureOptions::with_record(FeatureRecord::new("chr1", "exon", 10, 20)),
        Some(&store),
    )
    .unwrap();
    assert!(exon.primary_id().is_some());

    let mut mrna = FeatureNode::from_record(FeatureRecord::new("chr1", "mRNA", 15, 18));
    mrna.add_segment([exon]).unwrap();

    let embedded = mrna.children()[0].embedded().unwrap();
    assert_eq!(embedded.primary_id(), None);
    assert!(embedded.object_store().is_none());
    assert_eq!((mrna.start(), mrna.end()), (Some(10), Some(20)));
}

#[test]
fn embedded_additions_on_persisted_parent_are_written_back() {
    let (counter, store) = counting_store(StoreOptions::default());
    let mut mrna = persisted_mrna(&store, 1, 100);

    mrna.add_segment([ChildInput::range(5, 9)]).unwrap();

    // Only the parent write-back; embedded children are not stored separately.
    assert_eq!(counter.store_calls.get(), 2);
    assert_eq!(counter.stored_nodes.get(), 2);
    let reloaded = FeatureNode::load(&store, mrna.primary_id().unwrap()).unwrap();
    assert!(matches!(reloaded.children()[0], ChildRef::Embedded(_)));
}

#[test]
fn child_from_another_store_gets_a_new_identity() {
    let other = sqlite_store();
    let foreign = FeatureNode::new(
        FeatureOptions::with_record(FeatureRecord::new("chr1", "exon", 10, 20)),
        Some(&other),
    )
    .unwrap();
    let foreign_id = foreign.primary_id().unwrap();

    let (counter, store) = counting_store(StoreOptions::default());
    // Same id as `foreign`; reusing it would overwrite the parent row.
    let mut mrna = persisted_mrna(&store, 1, 100);
    assert_eq!(mrna.primary_id(), Some(foreign_id));
    let before = counter.stored_nodes.get();

    mrna.add_seq_feature([foreign]).unwrap();

    let child_id = mrna.children()[0].store_id().unwrap();
    assert_ne!(child_id, foreign_id);
    assert_eq!(counter.stored_nodes.get(), before + 2);
    let resolved = mrna.get_seq_features(&["exon"]).unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].primary_id(), Some(child_id));
}

#[test]
fn child_already_in_this_store_is_referenced_without_rewrite() {
    let (counter, store) = counting_store(StoreOptions::default());
    let exon = FeatureNode::new(
        FeatureOptions::with_record(FeatureRecord::new("chr1", "exon", 10, 20)),
        Some(&store),
    )
    .unwrap();
    let exon_id = exon.primary_id().unwrap();
    let mut mrna = persisted_mrna(&store, 1, 100);
    let before = counter.store_calls.get();

    mrna.add_seq_feature([exon]).unwrap();

    assert_eq!(mrna.children()[0].store_id(), Some(exon_id));
    // Only the parent write-back.
    assert_eq!(counter.store_calls.get(), before + 1);
}

#[test]
fn pairs_with_missing_coordinates_are_skipped() {
    let store = sqlite_store();
    let mut mrna = persisted_mrna(&store, 50, 60);

    mrna.add_seq_feature([
        ChildInput::Range {
            start: Some(5),
            end: None,
        },
        ChildInput::range(55, 58),
    ])
    .unwrap();

    assert_eq!(mrna.children().len(), 1);
    assert_eq!((mrna.start(), mrna.end()), (Some(50), Some(60)));
}

struct OligoHit {
    span: (i64, i64),
    tags: BTreeMap<String, Vec<String>>,
}

impl SeqFeature for OligoHit {
    fn seq_id(&self) -> Option<&str> {
        Some("chr1")
    }

    fn start(&self) -> Option<i64> {
        Some(self.span.0)
    }

    fn end(&self) -> Option<i64> {
        Some(self.span.1)
    }

    fn strand(&self) -> Strand {
        Strand::Forward
    }

    fn primary_tag(&self) -> Option<&str> {
        Some("oligo")
    }

    fn source_tag(&self) -> Option<&str> {
        Some("array")
    }

    fn display_name(&self) -> Option<&str> {
        Some("p-17")
    }

    fn score(&self) -> Option<f64> {
        Some(12.5)
    }

    fn all_tags(&self) -> Vec<String> {
        self.tags.keys().cloned().collect()
    }

    fn tag_values(&self, tag: &str) -> Vec<String> {
        self.tags.get(tag).cloned().unwrap_or_default()
    }
}

#[test]
fn foreign_feature_values_are_copied_with_their_tags() {
    let store = sqlite_store();
    let mut region = persisted_mrna(&store, 1, 100);
    let mut tags = BTreeMap::new();
    tags.insert("Note".to_string(), vec!["high signal".to_string()]);
    tags.insert("batch".to_string(), vec!["b1".to_string(), "b2".to_string()]);

    region
        .add_seq_feature([ChildInput::Feature(Box::new(OligoHit {
            span: (30, 45),
            tags,
        }))])
        .unwrap();

    let hits = region.get_seq_features(&["oligo:array"]).unwrap();
    assert_eq!(hits.len(), 1);
    let hit = &hits[0];
    assert_eq!(hit.display_name(), Some("p-17"));
    assert_eq!(hit.score(), Some(12.5));
    assert_eq!(hit.notes(), ["high signal".to_string()]);
    assert_eq!(hit.tag_values("batch"), vec!["b1", "b2"]);
}

#[test]
fn inverted_nodes_and_foreign_features_are_stored_reversed() {
    let store = sqlite_store();
    let mut mrna = persisted_mrna(&store, 50, 60);
    let mut nested = FeatureRecord::new("chr1", "exon", 80, 70);
    nested.strand = Strand::Forward;

    mrna.add_seq_feature([
        ChildInput::from(FeatureNode::from_record(nested)),
        ChildInput::Feature(Box::new(OligoHit {
            span: (45, 30),
            tags: BTreeMap::new(),
        })),
    ])
    .unwrap();

    let children = mrna.get_seq_features(&[]).unwrap();
    let spans: Vec<_> = children
        .iter()
        .map(|child| (child.start(), child.end(), child.strand()))
        .collect();
    assert_eq!(
        spans,
        vec![
            (Some(70), Some(80), Strand::Reverse),
            (Some(30), Some(45), Strand::Reverse),
        ]
    );
    assert_eq!((mrna.start(), mrna.end()), (Some(30), Some(80)));
}

#[test]
fn inverted_embedded_children_are_reversed() {
    let mut mrna = FeatureNode::from_record(FeatureRecord::new("chr1", "mRNA", 50, 60));

    mrna.add_segment([
        ChildInput::from(FeatureRecord::new("chr1", "exon", 80, 70)),
        ChildInput::Feature(Box::new(OligoHit {
            span: (45, 30),
            tags: BTreeMap::new(),
        })),
    ])
    .unwrap();

    for child in mrna.children() {
        let child = child.embedded().unwrap();
        assert!(child.start() <= child.end());
        assert_eq!(child.strand(), Strand::Reverse);
    }
    assert_eq!((mrna.start(), mrna.end()), (Some(30), Some(80)));
}

#[test]
fn inverted_json_object_child_is_reversed() {
    let input =
        ChildInput::try_from(&json!({ "type": "exon", "start": 90, "stop": 10, "strand": "+" }))
            .unwrap();
    let ChildInput::Node(node) = input else {
        panic!("object child should be a node");
    };

    assert_eq!((node.start(), node.end()), (Some(10), Some(90)));
    assert_eq!(node.strand(), Strand::Reverse);
}

#[test]
fn unsupported_json_child_is_rejected() {
    let err = ChildInput::try_from(&json!(42)).unwrap_err();
    assert!(matches!(err, NodeError::InvalidChild(_)));

    let err = ChildInput::try_from(&json!([1, "x"])).unwrap_err();
    assert!(matches!(err, NodeError::InvalidChild(_)));

    let pair = ChildInput::try_from(&json!([null, 9])).unwrap();
    assert!(matches!(
        pair,
        ChildInput::Range {
            start: None,
            end: Some(9)
        }
    ));
}
