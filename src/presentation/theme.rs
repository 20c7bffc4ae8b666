use eframe::egui;

pub struct Palette {
    pub bg: egui::Color32,
    pub fg: egui::Color32,
    pub stroke: egui::Color32,
    pub highlight: egui::Color32,
    pub active: egui::Color32,
    pub scanning: egui::Color32,
    pub error: egui::Color32,
}

impl Palette {
    pub fn new(is_dark: bool) -> Self {
        if is_dark {
            Self {
                bg: egui::Color32::from_rgb(22, 24, 28),
                fg: egui::Color32::from_gray(235),
                stroke: egui::Color32::from_gray(200),
                highlight: egui::Color32::from_rgb(0, 120, 215),
                active: egui::Color32::from_rgb(0, 90, 170),
                scanning: egui::Color32::from_rgb(0, 200, 120),
                error: egui::Color32::from_rgb(255, 90, 90),
            }
        } else {
            Self {
                bg: egui::Color32::from_rgb(246, 247, 249),
                fg: egui::Color32::from_gray(20),
                stroke: egui::Color32::from_gray(60),
                highlight: egui::Color32::from_rgb(160, 205, 255),
                active: egui::Color32::from_rgb(100, 170, 250),
                scanning: egui::Color32::from_rgb(0, 150, 80),
                error: egui::Color32::from_rgb(200, 30, 30),
            }
        }
    }
}

pub fn apply_theme(ctx: &egui::Context, is_dark: bool) {
    let mut style = (*ctx.style()).clone();
    let palette = Palette::new(is_dark);

    style
        .text_styles
        .iter_mut()
        .for_each(|(text_style, font_id)| {
            font_id.size = match text_style {
                egui::TextStyle::Heading => 24.0,
                egui::TextStyle::Body | egui::TextStyle::Button => 15.0,
                _ => font_id.size,
            };
        });

    style.spacing.item_spacing = egui::vec2(10.0, 8.0);
    style.spacing.button_padding = egui::vec2(14.0, 8.0);

    let rounding = egui::Rounding::same(4.0);
    let widgets = &mut style.visuals.widgets;
    widgets.noninteractive.bg_stroke = egui::Stroke::new(1.0, palette.stroke);
    widgets.noninteractive.fg_stroke = egui::Stroke::new(1.0, palette.fg);
    widgets.noninteractive.bg_fill = palette.bg;
    widgets.noninteractive.rounding = rounding;

    widgets.inactive.bg_stroke = egui::Stroke::new(1.0, palette.stroke);
    widgets.inactive.fg_stroke = egui::Stroke::new(1.0, palette.fg);
    widgets.inactive.rounding = rounding;

    widgets.hovered.bg_fill = palette.highlight;
    widgets.hovered.weak_bg_fill = palette.highlight;
    widgets.hovered.rounding = rounding;

    widgets.active.bg_fill = palette.active;
    widgets.active.weak_bg_fill = palette.active;
    widgets.active.rounding = rounding;

    style.visuals.window_rounding = rounding;
    style.visuals.window_fill = palette.bg;
    style.visuals.panel_fill = palette.bg;
    style.visuals.override_text_color = Some(palette.fg);

    ctx.set_style(style);
}
