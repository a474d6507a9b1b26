use tikzru::tikz_to_svg;

#[test]
fn line_between_unit_points() {
    let svg = tikz_to_svg("\\draw (0,0) -- (1,1);").unwrap();
    assert!(svg.contains("<path d=\"M 250.00 250.00 L 278.35 221.65\""));
    assert!(svg.contains("stroke: #000000; fill: none; stroke-width: 1px"));
}

#[test]
fn foreach_draws_one_circle_per_value() {
    let svg = tikz_to_svg("\\foreach \\x in {0,1,2} \\draw (\\x,0) circle (0.2);").unwrap();
    // Three circles, each drawn as two half-turn arcs.
    assert_eq!(svg.matches("A 5.67 5.67").count(), 6);
    assert!(svg.contains("M 244.33 250.00"));
    assert!(svg.contains("M 272.68 250.00"));
    assert!(svg.contains("M 301.03 250.00"));
}

#[test]
fn foreach_range_expands_at_parse_time() {
    let svg = tikz_to_svg("\\foreach \\i in {1,...,4} \\draw (\\i,0) -- (\\i,1);").unwrap();
    assert_eq!(svg.matches("<path").count(), 4);
}

#[test]
fn loop_variables_stay_inside_the_loop() {
    // After the loop, \x is unbound again, so the last line's coordinate
    // value degrades to 0 rather than reusing the final iteration value.
    let source = r"
        \foreach \x in {1,2} \draw (\x,0) -- (\x,1);
        \draw (\x,0) -- (0,1);
    ";
    let svg = tikz_to_svg(source).unwrap();
    assert!(svg.contains("M 250.00 250.00 L 250.00 221.65"));
}

#[test]
fn color_blend_mixes_toward_white() {
    let svg = tikz_to_svg("\\fill[red!50] (0,0) circle (1);").unwrap();
    assert!(svg.contains("fill: #FF8080"));
    assert!(svg.contains("stroke: none"));
}

#[test]
fn arc_without_a_cursor_degrades_to_empty_path() {
    // A one-shot relative start leaves no cursor behind, so the arc has
    // nothing to hang off and the path body stays empty.
    let svg = tikz_to_svg("\\draw +(1,0) arc (0:90:1);").unwrap();
    assert!(svg.contains("<path d=\"M 278.35 250.00\""));
}

#[test]
fn arc_from_a_fixed_start() {
    let svg = tikz_to_svg("\\draw (1,0) arc (0:90:1);").unwrap();
    assert!(svg.contains("M 278.35 250.00 A 28.35 28.35 0 0 1 250.00 221.65"));
}

#[test]
fn named_coordinates_last_write_wins() {
    let source = r"
        \coordinate (P) at (1,0);
        \coordinate (P) at (2,0);
        \draw (P) -- (0,0);
    ";
    let svg = tikz_to_svg(source).unwrap();
    assert!(svg.contains("M 306.70 250.00"));
}

#[test]
fn inline_coordinate_label_usable_later_in_same_path() {
    let svg = tikz_to_svg("\\draw (1,0) coordinate (a) -- (2,0) -- (a);").unwrap();
    assert!(svg.contains("M 278.35 250.00 L 306.70 250.00 L 278.35 250.00"));
}

#[test]
fn unknown_name_falls_back_to_origin() {
    let svg = tikz_to_svg("\\draw (missing) -- (1,0);").unwrap();
    assert!(svg.contains("M 250.00 250.00"));
}

#[test]
fn node_text_and_anchor_flags() {
    let svg = tikz_to_svg("\\node[right] at (1,1) {label};").unwrap();
    assert!(svg.contains(">label</text>"));
    assert!(svg.contains("text-anchor=\"start\""));
    assert!(svg.contains("x=\"278.35\" y=\"221.65\""));
}

#[test]
fn node_math_text_keeps_content_without_delimiters() {
    let svg = tikz_to_svg("\\node at (0,0) {$x^2$};").unwrap();
    assert!(svg.contains(">x^2</text>"));
}

#[test]
fn named_node_position_is_reusable() {
    let source = r"
        \node (origin) at (2,0) {O};
        \draw (origin) -- (0,0);
    ";
    let svg = tikz_to_svg(source).unwrap();
    assert!(svg.contains("M 306.70 250.00 L 250.00 250.00"));
}

#[test]
fn inline_node_inherits_draw_color() {
    let svg = tikz_to_svg("\\draw[red] (0,0) -- (1,0) node {end};").unwrap();
    assert!(svg.contains(">end</text>"));
    assert!(svg.contains("fill: #FF0000"));
}

#[test]
fn arrows_emit_markers_once() {
    let svg = tikz_to_svg("\\draw[->] (0,0) -- (1,0); \\draw[<->] (0,1) -- (1,1);").unwrap();
    assert_eq!(svg.matches("<defs>").count(), 1);
    assert!(svg.contains("marker-end=\"url(#arrow-end)\""));
    assert!(svg.contains("marker-start=\"url(#arrow-start)\""));
}

#[test]
fn pgfmath_macro_feeds_coordinates() {
    let source = r"
        \pgfmathsetmacro{\r}{sqrt(4)}
        \draw (0,0) -- (\r,0);
    ";
    let svg = tikz_to_svg(source).unwrap();
    assert!(svg.contains("L 306.70 250.00"));
}

#[test]
fn def_macro_expands_textually() {
    let svg = tikz_to_svg("\\def\\unit{1} \\draw (0,0) -- (\\unit,\\unit);").unwrap();
    assert!(svg.contains("L 278.35 221.65"));
}

#[test]
fn scope_options_style_the_group_only() {
    let source = r"
        \begin{scope}[red]
            \draw (0,0) -- (1,0);
        \end{scope}
    ";
    let svg = tikz_to_svg(source).unwrap();
    assert!(svg.contains("<g style=\"stroke: #FF0000"));
    // The inner path keeps its own default stroke.
    assert!(svg.contains("<path d=\"M 250.00 250.00 L 278.35 250.00\" style=\"stroke: #000000"));
}

#[test]
fn rectangle_and_cycle() {
    let svg = tikz_to_svg("\\draw (0,0) rectangle (1,1); \\draw (0,0) -- (1,0) -- (1,1) -- cycle;")
        .unwrap();
    assert!(svg.contains("M 250.00 250.00 L 278.35 250.00 L 278.35 221.65 L 250.00 221.65 Z"));
    assert!(svg.contains("L 278.35 221.65 Z"));
}

#[test]
fn relative_chain_with_persistent_cursor() {
    let svg = tikz_to_svg("\\draw (0,0) -- ++(1,0) -- ++(0,1);").unwrap();
    assert!(svg.contains("M 250.00 250.00 L 278.35 250.00 L 278.35 221.65"));
}

#[test]
fn polar_coordinates() {
    let svg = tikz_to_svg("\\draw (0,0) -- (90:1);").unwrap();
    assert!(svg.contains("L 250.00 221.65"));
}

#[test]
fn comments_and_surrounding_prose_are_ignored() {
    let source = r"
        Some prose before the picture.
        \begin{tikzpicture}
            \draw (0,0) -- (1,0); % trailing comment
        \end{tikzpicture}
        And after.
    ";
    let svg = tikz_to_svg(source).unwrap();
    assert!(svg.contains("M 250.00 250.00 L 278.35 250.00"));
}

#[test]
fn parse_error_is_the_only_hard_failure() {
    assert!(tikz_to_svg("\\draw (0,0 -- (1,1);").is_err());
    // Bad expressions degrade to 0 instead of failing.
    let svg = tikz_to_svg("\\draw (1/0,0) -- (1,0);").unwrap();
    assert!(svg.contains("M 250.00 250.00"));
}

#[test]
fn foreach_with_evaluate_clause() {
    let source = r"\foreach \i [evaluate=\i as \y using \i*\i] in {1,2} \draw (\i,\y) circle (0.1);";
    let svg = tikz_to_svg(source).unwrap();
    // (2,4): y = 250 - 4*28.35 = 136.60.
    assert!(svg.contains("136.60"));
}

#[test]
fn foreach_tuples_bind_multiple_variables() {
    let source = r"\foreach \x/\y in {0/1, 1/2} \draw (\x,\y) -- (0,0);";
    let svg = tikz_to_svg(source).unwrap();
    assert!(svg.contains("M 250.00 221.65"));
    assert!(svg.contains("M 278.35 193.30"));
}
