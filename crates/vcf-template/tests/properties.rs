//! Property tests for fuzzy capture and the serializer.

use proptest::prelude::*;

use vcf_core::graph::LogicalForm;
use vcf_core::node::LfNode;
use vcf_template::{compile, Matcher, TemplateLibrary};

const CAPTURE: &str = r#"<commands><command name="CAPTURE">
  <component indicator="SPEECHACT">
    <role name="NEUTRAL"><component fuzzy="True" group="text" map_param="text"/></role>
  </component>
</command></commands>"#;

fn capture_library() -> TemplateLibrary {
    compile(CAPTURE).unwrap().library
}

/// A random tree: `parents[i]` is the parent of node `i + 1`, always an
/// earlier node.
fn tree() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(any::<prop::sample::Index>(), 0..24).prop_map(|picks| {
        picks
            .iter()
            .enumerate()
            .map(|(i, pick)| pick.index(i + 1))
            .collect()
    })
}

/// Builds `SPEECHACT -NEUTRAL-> node0` plus the tree below node0.
fn build(parents: &[usize], spans: Option<&[u32]>) -> LogicalForm {
    let mut lf = LogicalForm::new();
    let root = lf.add_node(LfNode::new("SPEECHACT", "SA_TELL"));
    let mut ids = Vec::new();
    for i in 0..=parents.len() {
        let mut node = LfNode::new("F", "THING").with_word(format!("w{}", i));
        if let Some(spans) = spans {
            node = node.with_span(spans[i], spans[i] + 1);
        }
        ids.push(lf.add_node(node));
    }
    lf.add_role(root, "NEUTRAL", ids[0]).unwrap();
    for (i, parent) in parents.iter().enumerate() {
        lf.add_role(ids[*parent], "MOD", ids[i + 1]).unwrap();
    }
    lf
}

fn preorder(parents: &[usize], node: usize, out: &mut Vec<String>) {
    out.push(format!("w{}", node));
    for (i, parent) in parents.iter().enumerate() {
        if *parent == node {
            preorder(parents, i + 1, out);
        }
    }
}

// ---------------------------------------------------------------------------
// Template generation
// ---------------------------------------------------------------------------

fn attributes() -> impl Strategy<Value = String> {
    (
        prop::option::of(prop::sample::select(vec!["SPEECHACT", "F", "BARE"])),
        prop::option::of(prop::sample::select(vec!["MOVE", "PERSON", "SA_REQUEST"])),
        prop::option::of(prop::sample::select(vec!["left", "left, right", "TOP,bottom"])),
        prop::option::of(prop::sample::select(vec!["row", "col", "row,col"])),
        prop::option::of(prop::sample::select(vec!["where", "query"])),
    )
        .prop_map(|(indicator, lf_type, word, param, group)| {
            let mut attrs = String::new();
            for (key, value) in [
                ("indicator", indicator),
                ("type", lf_type),
                ("word", word),
                ("map_param", param),
                ("group", group),
            ] {
                if let Some(value) = value {
                    attrs.push_str(&format!(" {}=\"{}\"", key, value));
                }
            }
            attrs
        })
}

fn role(inner: BoxedStrategy<String>) -> impl Strategy<Value = String> {
    let content = prop_oneof![
        inner.clone(),
        Just("PRES".to_string()),
        inner.prop_map(|component| {
            format!("<rolegroup><role name=\"MOD\">{}</role></rolegroup>", component)
        }),
    ];
    (prop::sample::select(vec!["CONTENT", "MOD", "AGENT"]), content)
        .prop_map(|(name, content)| format!("<role name=\"{}\">{}</role>", name, content))
}

fn component() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        attributes().prop_map(|attrs| format!("<component{}/>", attrs)),
        prop::option::of(prop::sample::select(vec!["query", "rest"])).prop_map(|param| {
            match param {
                Some(param) => format!("<component fuzzy=\"True\" map_param=\"{}\"/>", param),
                None => "<component fuzzy=\"True\"/>".to_string(),
            }
        }),
        Just("<component from_id=\"shared\"/>".to_string()),
    ];
    leaf.prop_recursive(3, 32, 3, |inner| {
        (
            attributes(),
            prop::collection::vec(role(inner.clone()), 0..3),
            prop::collection::vec(prop::collection::vec(role(inner), 1..3), 0..3),
        )
            .prop_map(|(attrs, roles, groups)| {
                let groups: String = groups
                    .iter()
                    .map(|roles| format!("<rolegroup>{}</rolegroup>", roles.concat()))
                    .collect();
                format!("<component{}>{}{}</component>", attrs, roles.concat(), groups)
            })
    })
}

fn document() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::collection::vec(component(), 1..3), 1..4).prop_map(|commands| {
        let mut doc = String::from(
            "<commands><component id=\"shared\" indicator=\"PRO\" type=\"PERSON\" map_param=\"agent\"/>",
        );
        for (i, roots) in commands.iter().enumerate() {
            doc.push_str(&format!("<command name=\"C{}\">{}</command>", i, roots.concat()));
        }
        doc.push_str("</commands>");
        doc
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn fuzzy_capture_follows_traversal_order(parents in tree()) {
        let library = capture_library();
        let lf = build(&parents, None);
        let mut expected = Vec::new();
        preorder(&parents, 0, &mut expected);

        let outcome = Matcher::new(&library).match_form(&lf).unwrap();
        let matched = outcome.command().unwrap();
        prop_assert_eq!(&matched.params["text"], &expected.join(" "));
        prop_assert_eq!(&matched.groups["text"], &expected.join(" "));
    }

    #[test]
    fn fuzzy_capture_follows_spans_when_present(
        (parents, starts) in tree().prop_flat_map(|parents| {
            let starts: Vec<u32> = (0..=parents.len() as u32).map(|i| i * 10).collect();
            (Just(parents), Just(starts).prop_shuffle())
        })
    ) {
        let library = capture_library();
        let lf = build(&parents, Some(&starts));
        let mut by_start: Vec<(u32, String)> = starts
            .iter()
            .enumerate()
            .map(|(i, start)| (*start, format!("w{}", i)))
            .collect();
        by_start.sort();
        let expected: Vec<String> = by_start.into_iter().map(|(_, word)| word).collect();

        let outcome = Matcher::new(&library).match_form(&lf).unwrap();
        prop_assert_eq!(&outcome.command().unwrap().params["text"], &expected.join(" "));
    }

    #[test]
    fn serializer_round_trips(doc in document()) {
        let library = compile(&doc).unwrap().library;
        let xml = library.to_xml();
        let again = compile(&xml).unwrap().library;
        prop_assert_eq!(&again, &library);
        prop_assert_eq!(again.to_xml(), xml);
    }
}
