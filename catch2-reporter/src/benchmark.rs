// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{errors::TagError, event::TestEventBuilder};
use catch2_xml::XmlElement;
use swrite::{SWrite, swrite};

/// Renders one `BenchmarkResults` element.
///
/// Nothing is appended if the element is malformed.
pub(crate) fn render_benchmark(
    builder: &mut TestEventBuilder,
    benchmark: &XmlElement,
    depth: usize,
) -> Result<(), TagError> {
    let name = benchmark
        .attr("name")
        .ok_or_else(|| TagError::missing_attribute(benchmark, "name"))?;

    let mut lines = Vec::new();
    for mean in benchmark.children_named("mean") {
        let (value, rest) = sample(mean)?;
        lines.push(format!("Mean: {value} ns  ({rest})"));
    }
    for deviation in benchmark.children_named("standardDeviation") {
        let (value, rest) = sample(deviation)?;
        lines.push(format!("Standard Deviation: {value} ns  ({rest})"));
    }
    for outliers in benchmark.children_named("outliers") {
        lines.push(format!(
            "Outliers: {}",
            join_attributes(outliers, |_| true, " ns")
        ));
    }
    lines.push(format!(
        "Parameters: {}",
        join_attributes(benchmark, |key| key != "name", "")
    ));

    builder.append_message(format!("⮑ benchmark of \"{name}\""), depth);
    for line in lines {
        builder.append_message(line, depth + 1);
    }
    Ok(())
}

/// Splits a measurement into its `value` and the remaining attributes, rendered in nanoseconds.
fn sample(element: &XmlElement) -> Result<(&str, String), TagError> {
    let value = element
        .attr("value")
        .ok_or_else(|| TagError::missing_attribute(element, "value"))?;
    Ok((value, join_attributes(element, |key| key != "value", " ns")))
}

fn join_attributes(element: &XmlElement, include: impl Fn(&str) -> bool, unit: &str) -> String {
    let mut out = String::new();
    for (key, value) in element.attributes.iter().filter(|(key, _)| include(key)) {
        if !out.is_empty() {
            out.push_str(", ");
        }
        swrite!(out, "{key}: {value}{unit}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn benchmark() -> XmlElement {
        XmlElement::new("BenchmarkResults")
            .with_attribute("name", "Fibonacci 20")
            .with_attribute("samples", "100")
            .with_attribute("iterations", "2")
            .with_child(
                XmlElement::new("mean")
                    .with_attribute("value", "12.3")
                    .with_attribute("lowerBound", "11.0")
                    .with_attribute("upperBound", "13.5"),
            )
            .with_child(
                XmlElement::new("standardDeviation")
                    .with_attribute("value", "0.8")
                    .with_attribute("lowerBound", "0.5"),
            )
            .with_child(
                XmlElement::new("outliers")
                    .with_attribute("variance", "0.1")
                    .with_attribute("lowMild", "2"),
            )
    }

    #[test]
    fn render() {
        let mut builder = TestEventBuilder::new();
        render_benchmark(&mut builder, &benchmark(), 1).expect("benchmark renders");

        let result = builder.build();
        let lines: Vec<_> = result
            .entries()
            .iter()
            .map(|entry| (entry.indent(), entry.text()))
            .collect();
        assert_eq!(
            lines,
            vec![
                (Some(1), "⮑ benchmark of \"Fibonacci 20\""),
                (
                    Some(2),
                    "Mean: 12.3 ns  (lowerBound: 11.0 ns, upperBound: 13.5 ns)"
                ),
                (Some(2), "Standard Deviation: 0.8 ns  (lowerBound: 0.5 ns)"),
                (Some(2), "Outliers: variance: 0.1 ns, lowMild: 2 ns"),
                (Some(2), "Parameters: samples: 100, iterations: 2"),
            ]
        );
    }

    #[test]
    fn missing_value_appends_nothing() {
        let element = XmlElement::new("BenchmarkResults")
            .with_attribute("name", "bench")
            .with_child(XmlElement::new("mean").with_attribute("lowerBound", "1"));

        let mut builder = TestEventBuilder::new();
        let err = render_benchmark(&mut builder, &element, 0).unwrap_err();
        assert_eq!(
            err,
            TagError::MissingAttribute {
                element: "mean".to_owned(),
                attribute: "value",
            }
        );
        assert!(builder.build().entries().is_empty());
    }

    #[test]
    fn missing_name() {
        let mut builder = TestEventBuilder::new();
        let err = render_benchmark(&mut builder, &XmlElement::new("BenchmarkResults"), 0)
            .unwrap_err();
        assert!(matches!(err, TagError::MissingAttribute { attribute: "name", .. }));
    }
}
