use crate::explorer::model::NavigationModel;
use crate::screen::snapshot::ElementNode;

// ============================================================================
// Navigation model as XML
// ============================================================================

/// Render a navigation model as an XML document.
///
/// ```xml
/// <?xml version="1.0" encoding="UTF-8"?>
/// <model id="com.example.app">
///   <node activity="com.example.app/.MainActivity">
///     <page depth="0">
///       <view class="android.widget.FrameLayout" package="com.example.app" clickable="false" scrollable="false" text="">
///         <view class="android.widget.TextView" ... text="Privacy" />
///       </view>
///     </page>
///   </node>
/// </model>
/// ```
///
/// A view's text variants are joined by newlines inside the attribute.
pub fn generate_model_xml(model: &NavigationModel) -> String {
    let mut body = String::new();
    for node in &model.nodes {
        body.push_str(&format!(
            "  <node activity=\"{}\">\n",
            escape_xml(&node.screen_id)
        ));
        for page in &node.pages {
            body.push_str(&format!("    <page depth=\"{}\">\n", page.depth()));
            write_view(&mut body, &page.snapshot().root, 3);
            body.push_str("    </page>\n");
        }
        body.push_str("  </node>\n");
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<model id=\"{id}\">\n{body}</model>\n",
        id = escape_xml(&model.app_id),
        body = body,
    )
}

fn write_view(out: &mut String, view: &ElementNode, level: usize) {
    let indent = "  ".repeat(level);
    let text: Vec<&str> = view
        .text
        .iter()
        .map(String::as_str)
        .filter(|t| !t.is_empty())
        .collect();
    let open = format!(
        "{indent}<view class=\"{class}\" package=\"{package}\" clickable=\"{clickable}\" scrollable=\"{scrollable}\" text=\"{text}\"",
        indent = indent,
        class = escape_xml(&view.class_name),
        package = escape_xml(&view.package),
        clickable = view.clickable,
        scrollable = view.scrollable,
        text = escape_xml(&text.join("\n")),
    );

    if view.children.is_empty() {
        out.push_str(&open);
        out.push_str(" />\n");
        return;
    }

    out.push_str(&open);
    out.push_str(">\n");
    for child in &view.children {
        write_view(out, child, level + 1);
    }
    out.push_str(&format!("{}</view>\n", indent));
}

/// Escape XML special characters, including line breaks inside attribute values.
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
        .replace('\n', "&#10;")
}
