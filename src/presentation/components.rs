use eframe::egui;

pub fn page_title(ui: &mut egui::Ui, text: &str) {
    ui.label(egui::RichText::new(text).strong().size(22.0));
}

/// Titled section: header row, a rule, then the body on the theme's
/// faint fill.
pub fn section<R>(
    ui: &mut egui::Ui,
    title: &str,
    add_contents: impl FnOnce(&mut egui::Ui) -> R,
) -> R {
    egui::Frame::group(ui.style())
        .fill(ui.visuals().faint_bg_color)
        .inner_margin(12.0)
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.label(egui::RichText::new(title).strong().size(16.0));
            ui.separator();
            ui.add_space(4.0);
            add_contents(ui)
        })
        .inner
}

/// Full-width state banner, painted directly so the fill spans the row.
pub fn banner(ui: &mut egui::Ui, text: &str, fill: egui::Color32, text_color: egui::Color32) {
    let size = egui::vec2(ui.available_width(), 30.0);
    let (rect, _) = ui.allocate_exact_size(size, egui::Sense::hover());
    ui.painter().rect_filled(rect, 3.0, fill);
    ui.painter().text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        text,
        egui::FontId::proportional(15.0),
        text_color,
    );
}
