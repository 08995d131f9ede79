use eframe::egui;

/// Flat, high-contrast style with chunky spacing, in a light and a dark
/// variant.
pub fn configure_style(ctx: &egui::Context, is_dark: bool) {
    let mut style = (*ctx.style()).clone();

    let (bg, fg, stroke) = if is_dark {
        (
            egui::Color32::from_rgb(24, 26, 27),
            egui::Color32::WHITE,
            egui::Color32::from_gray(190),
        )
    } else {
        (
            egui::Color32::from_rgb(248, 248, 246),
            egui::Color32::BLACK,
            egui::Color32::from_gray(40),
        )
    };

    style
        .text_styles
        .iter_mut()
        .for_each(|(text_style, font_id)| {
            font_id.size = match text_style {
                egui::TextStyle::Heading => 24.0,
                egui::TextStyle::Body => 15.0,
                egui::TextStyle::Button => 15.0,
                _ => font_id.size,
            };
        });

    style.spacing.item_spacing = egui::vec2(10.0, 10.0);
    style.spacing.button_padding = egui::vec2(14.0, 8.0);

    style.visuals.widgets.noninteractive.bg_stroke = egui::Stroke::new(1.5, stroke);
    style.visuals.widgets.noninteractive.bg_fill = bg;
    style.visuals.widgets.noninteractive.fg_stroke = egui::Stroke::new(1.0, fg);
    style.visuals.widgets.noninteractive.rounding = egui::Rounding::same(2.0);

    style.visuals.widgets.inactive.bg_stroke = egui::Stroke::new(1.5, stroke);
    style.visuals.widgets.inactive.bg_fill = if is_dark {
        egui::Color32::from_gray(34)
    } else {
        egui::Color32::WHITE
    };
    style.visuals.widgets.inactive.fg_stroke = egui::Stroke::new(1.0, fg);
    style.visuals.widgets.inactive.rounding = egui::Rounding::same(2.0);

    style.visuals.widgets.hovered.bg_stroke = egui::Stroke::new(2.0, stroke);
    style.visuals.widgets.hovered.rounding = egui::Rounding::same(2.0);

    style.visuals.panel_fill = bg;
    style.visuals.window_fill = bg;
    style.visuals.override_text_color = Some(fg);

    ctx.set_style(style);
}
