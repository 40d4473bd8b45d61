use eframe::egui::{self, Color32, FontId, Sense, Ui, vec2};

use truthgraph::feed::HeadlineStatus;

use super::super::TruthGraphApp;

const SCROLL_SPEED: f32 = 40.0;
const ITEM_GAP: f32 = 48.0;

fn status_color(status: HeadlineStatus) -> Color32 {
    match status {
        HeadlineStatus::Verified => Color32::from_rgb(34, 197, 94),
        HeadlineStatus::Debunked => Color32::from_rgb(239, 68, 68),
        HeadlineStatus::Uncertain => Color32::from_rgb(245, 158, 11),
    }
}

impl TruthGraphApp {
    pub(in crate::app) fn draw_ticker(&mut self, ui: &mut Ui) {
        ui.horizontal_centered(|ui| {
            let refreshing = self.headlines_rx.is_some();
            if ui
                .add_enabled(!refreshing, egui::Button::new("⟳").small())
                .on_hover_text("Fetch fresh headlines")
                .clicked()
            {
                self.refresh_headlines();
            }

            let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click());
            let painter = ui.painter_at(rect);
            if self.headlines.is_empty() {
                return;
            }

            let font = FontId::proportional(13.0);
            let items = self
                .headlines
                .iter()
                .map(|headline| {
                    let badge = painter.layout_no_wrap(
                        headline.status.label().to_owned(),
                        FontId::proportional(11.0),
                        status_color(headline.status),
                    );
                    let title = painter.layout_no_wrap(
                        format!("{}  ·  {}", headline.title, headline.source),
                        font.clone(),
                        Color32::from_gray(220),
                    );
                    (headline, badge, title)
                })
                .collect::<Vec<_>>();
            let strip_width = items
                .iter()
                .map(|(_, badge, title)| badge.size().x + 8.0 + title.size().x + ITEM_GAP)
                .sum::<f32>()
                .max(1.0);

            let hovered = response.hovered();
            if !hovered {
                let dt = ui.input(|input| input.stable_dt).min(0.1);
                self.ticker_offset = (self.ticker_offset + dt * SCROLL_SPEED) % strip_width;
            }
            let offset = self.ticker_offset;

            let pointer = response.hover_pos();
            let mut clicked_url = None;
            let mut x = rect.left() - offset;
            while x < rect.right() {
                for (headline, badge, title) in &items {
                    let y = rect.center().y;
                    let badge_width = badge.size().x;
                    let title_width = title.size().x;
                    let item_rect = egui::Rect::from_min_size(
                        egui::pos2(x, rect.top()),
                        vec2(badge_width + 8.0 + title_width, rect.height()),
                    );

                    if item_rect.right() >= rect.left() && item_rect.left() <= rect.right() {
                        painter.galley(
                            egui::pos2(x, y - badge.size().y * 0.5),
                            badge.clone(),
                            Color32::WHITE,
                        );
                        painter.galley(
                            egui::pos2(x + badge_width + 8.0, y - title.size().y * 0.5),
                            title.clone(),
                            Color32::WHITE,
                        );
                        if pointer.is_some_and(|pointer| item_rect.contains(pointer)) {
                            let underline = rect.center().y + title.size().y * 0.5 + 1.0;
                            painter.line_segment(
                                [
                                    egui::pos2(x + badge_width + 8.0, underline),
                                    egui::pos2(item_rect.right(), underline),
                                ],
                                egui::Stroke::new(1.0, Color32::from_gray(200)),
                            );
                            if response.clicked() {
                                clicked_url = Some(headline.url.clone());
                            }
                        }
                    }
                    x += badge_width + 8.0 + title_width + ITEM_GAP;
                }
            }

            if let Some(url) = clicked_url {
                ui.ctx().open_url(egui::OpenUrl::new_tab(url));
            }
            if !hovered {
                ui.ctx().request_repaint();
            }
        });
    }
}
