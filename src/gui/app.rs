use std::sync::mpsc::Sender;

use iced::widget::image::Handle;
use iced::widget::{button, column, container, image as picture, mouse_area, row, text};
use iced::{Element, Length, Task};
use tracing::warn;

use super::{Message, PointerTracker};
use crate::annotation::{AnnotationQueue, AnnotationSession, DragState, SessionOutcome};

/// Window that walks the positive images one session at a time.
pub struct AnnotatorApp {
    queue: AnnotationQueue,
    session: Option<AnnotationSession>,
    handle: Option<Handle>,
    pointer: PointerTracker,
    outcomes: Sender<SessionOutcome>,
}

impl AnnotatorApp {
    pub fn new(queue: AnnotationQueue, outcomes: Sender<SessionOutcome>) -> Self {
        let mut app = Self {
            queue,
            session: None,
            handle: None,
            pointer: PointerTracker::default(),
            outcomes,
        };
        app.advance();
        app
    }

    pub fn title(&self) -> String {
        match &self.session {
            Some(session) => format!("Select the objects - {}", session.image_path()),
            None => "Select the objects".to_string(),
        }
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        let Some(session) = self.session.as_mut() else {
            return iced::exit();
        };
        let (width, height) = session.dimensions();

        let mut finished = None;
        let mut redraw = false;
        match message {
            Message::PointerMoved(point) => {
                let pos = self.pointer.update(point, width, height);
                redraw = matches!(session.drag(), DragState::Dragging { .. });
                session.pointer_moved(pos);
            }
            Message::PointerPressed => {
                if let Some(pos) = self.pointer.current() {
                    session.pointer_pressed(pos);
                }
            }
            Message::PointerReleased => {
                if let Some(pos) = self.pointer.current() {
                    session.pointer_released(pos);
                    redraw = true;
                }
            }
            Message::Undo => {
                redraw = session.undo().is_some();
            }
            Message::Confirm => finished = session.confirm(),
            Message::Skip => finished = session.skip(),
        }

        if let Some(outcome) = finished {
            if self.outcomes.send(outcome).is_err() {
                warn!("Annotation receiver went away; stopping");
                return iced::exit();
            }
            self.advance();
            if self.session.is_none() {
                return iced::exit();
            }
        } else if redraw {
            self.refresh_canvas();
        }
        Task::none()
    }

    pub fn view(&self) -> Element<'_, Message> {
        let (Some(session), Some(handle)) = (&self.session, &self.handle) else {
            return container(text("All images processed."))
                .center_x(Length::Fill)
                .center_y(Length::Fill)
                .into();
        };
        let (width, height) = session.dimensions();

        let image_area = mouse_area(
            picture(handle.clone())
                .width(Length::Fixed(width as f32))
                .height(Length::Fixed(height as f32)),
        )
        .on_move(Message::PointerMoved)
        .on_press(Message::PointerPressed)
        .on_release(Message::PointerReleased);

        let controls = row![
            button("Confirm").on_press(Message::Confirm),
            button("Undo last box").on_press(Message::Undo),
            button("Skip image").on_press(Message::Skip),
        ]
        .spacing(10);

        column![
            text(format!(
                "Image {}/{}: {}",
                self.queue.position(),
                self.queue.len(),
                session.image_path()
            )),
            text(format!("{} box(es) marked", session.boxes().len())),
            image_area,
            controls,
        ]
        .spacing(10)
        .padding(10)
        .into()
    }

    fn advance(&mut self) {
        self.pointer.reset();
        self.session = self.queue.next_session();
        self.refresh_canvas();
    }

    fn refresh_canvas(&mut self) {
        self.handle = self.session.as_ref().map(|session| {
            let canvas = session.canvas();
            Handle::from_rgba(canvas.width(), canvas.height(), canvas.as_raw().clone())
        });
    }
}
