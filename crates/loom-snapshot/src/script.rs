/// In-page walker injected via `BrowserDriver::evaluate`. Walks
/// `document.body` depth-first, skipping non-content tags, stamping each
/// visited element with `data-dom-id`/`data-dom-path` if absent, and
/// returns `{domTree, controls, stats}` as a single JSON value.
///
/// `{{MAX_DEPTH}}` and `{{MAX_NODES}}` are substituted by the caller.
pub const WALKER_SCRIPT_TEMPLATE: &str = r#"
(() => {
  const SKIP_TAGS = new Set(['script', 'style', 'noscript', 'iframe', 'embed', 'object', 'svg', 'meta', 'link', 'head']);
  const MAX_DEPTH = {{MAX_DEPTH}};
  const MAX_NODES = {{MAX_NODES}};
  let nextId = 0;
  let nodeCount = 0;

  function computePath(el) {
    const segments = [];
    let cur = el;
    while (cur && cur.nodeType === 1 && cur !== document.documentElement) {
      const tag = cur.tagName.toLowerCase();
      if (cur.id) {
        segments.unshift(`${tag}#${cur.id}`);
        break;
      }
      const firstClass = (cur.className || '').toString().trim().split(/\s+/)[0];
      if (firstClass) {
        segments.unshift(`${tag}.${firstClass}`);
      } else {
        segments.unshift(tag);
      }
      cur = cur.parentElement;
    }
    return segments.join(' > ');
  }

  function attrsOf(el) {
    return {
      id: el.id || null,
      class: el.className ? el.className.toString() : null,
      role: el.getAttribute('role'),
      'aria-label': el.getAttribute('aria-label'),
      'data-test': el.getAttribute('data-test'),
      name: el.getAttribute('name'),
      type: el.getAttribute('type'),
      placeholder: el.getAttribute('placeholder'),
    };
  }

  function stampId(el) {
    if (!el.hasAttribute('data-dom-id')) {
      el.setAttribute('data-dom-id', `dom-${nextId++}`);
    }
    if (!el.hasAttribute('data-dom-path')) {
      el.setAttribute('data-dom-path', computePath(el));
    }
    return el.getAttribute('data-dom-id');
  }

  function walk(el, depth) {
    if (!el || SKIP_TAGS.has(el.tagName.toLowerCase())) return null;
    if (depth > MAX_DEPTH || nodeCount >= MAX_NODES) return null;
    nodeCount += 1;

    const domId = stampId(el);
    const text = (el.textContent || '').trim().slice(0, 120);
    const children = [];
    for (const child of el.children) {
      const walked = walk(child, depth + 1);
      if (walked) children.push(walked);
    }

    return {
      dom_id: domId,
      tag: el.tagName.toLowerCase(),
      depth,
      attrs: attrsOf(el),
      path: el.getAttribute('data-dom-path'),
      text,
      children,
    };
  }

  const domTree = walk(document.body, 0);

  const controls = [];
  document.querySelectorAll('input, textarea, select, button').forEach((el) => {
    if (SKIP_TAGS.has(el.tagName.toLowerCase())) return;
    const domId = stampId(el);
    controls.push({
      dom_id: domId,
      tag: el.tagName.toLowerCase(),
      attrs: attrsOf(el),
      path: el.getAttribute('data-dom-path'),
    });
  });

  return {
    dom_tree: domTree,
    controls,
    stats: { node_count: nodeCount, max_depth: MAX_DEPTH },
  };
})()
"#;

/// Secondary walk over the same tree producing a flattened accessibility
/// listing (role, computed name, exposed state) for every element, not just
/// ones with an explicit ARIA role.
pub const A11Y_SCRIPT: &str = r#"
(() => {
  const IMPLICIT_ROLES = { a: 'link', button: 'button', input: 'textbox', textarea: 'textbox',
    select: 'combobox', img: 'img', h1: 'heading', h2: 'heading', h3: 'heading' };
  const nodes = [];
  document.querySelectorAll('[data-dom-id]').forEach((el) => {
    const role = el.getAttribute('role') || IMPLICIT_ROLES[el.tagName.toLowerCase()] || 'generic';
    const name = el.getAttribute('aria-label') || el.getAttribute('alt') || (el.textContent || '').trim().slice(0, 120);
    nodes.push({ dom_id: el.getAttribute('data-dom-id'), role, name });
  });
  return nodes;
})()
"#;

pub fn render_walker_script(max_depth: usize, max_nodes: usize) -> String {
    WALKER_SCRIPT_TEMPLATE
        .replace("{{MAX_DEPTH}}", &max_depth.to_string())
        .replace("{{MAX_NODES}}", &max_nodes.to_string())
}
