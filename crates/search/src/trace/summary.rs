use super::{TraceDepth, TraceResult};

/// One-line chain for display, e.g.
/// `Route checkout/cart/add → Vendor\Checkout\Controller\Cart\Add::execute → 2 plugins, 1 observer`.
#[must_use]
pub fn summarize(result: &TraceResult) -> String {
    let mut chain = vec![format!("{} {}", result.entry_type.label(), result.entry_point)];

    if let Some(handler) = result.handler.first() {
        chain.push(handler.identifier());
    } else if result.observers.is_empty() {
        chain.push("unresolved handler".to_string());
    }

    let mut counts = vec![
        count(result.plugins.len(), "plugin"),
        count(result.observers.len(), "observer"),
    ];
    if result.depth == TraceDepth::Deep {
        for (n, noun) in [
            (result.preferences.len(), "preference"),
            (result.layout.len(), "layout"),
            (result.templates.len(), "template"),
        ] {
            if n > 0 {
                counts.push(count(n, noun));
            }
        }
    }
    chain.push(counts.join(", "));
    chain.join(" → ")
}

fn count(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("1 {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{EntryType, TraceHit};
    use pretty_assertions::assert_eq;

    fn hit(path: &str, class: &str, method: Option<&str>) -> TraceHit {
        TraceHit {
            path: path.to_string(),
            class_name: Some(class.to_string()),
            method_name: method.map(str::to_string),
            score: 1.0,
        }
    }

    #[test]
    fn summarizes_route_chain() {
        let mut result =
            TraceResult::empty("checkout/cart/add", EntryType::Route, TraceDepth::Shallow);
        result.handler.push(hit(
            "app/code/Magento/Checkout/Controller/Cart/Add.php",
            "Magento\\Checkout\\Controller\\Cart\\Add",
            Some("execute"),
        ));
        result.plugins.push(hit("a/Plugin/A.php", "A", None));
        result.plugins.push(hit("b/Plugin/B.php", "B", None));
        result.observers.push(hit("c/Observer/C.php", "C", None));

        assert_eq!(
            summarize(&result),
            "Route checkout/cart/add → Magento\\Checkout\\Controller\\Cart\\Add::execute → 2 plugins, 1 observer"
        );
    }

    #[test]
    fn deep_summary_lists_extra_stages() {
        let mut result =
            TraceResult::empty("sales_order_place_after", EntryType::Event, TraceDepth::Deep);
        result.observers.push(hit("c/Observer/C.php", "C", None));
        result.preferences.push(hit("etc/di.xml", "di", None));
        assert_eq!(
            summarize(&result),
            "Event sales_order_place_after → 0 plugins, 1 observer, 1 preference"
        );
    }
}
