use iced::Point;

#[derive(Debug, Clone)]
pub enum Message {
    PointerMoved(Point),
    PointerPressed,
    PointerReleased,
    Undo,
    Confirm,
    Skip,
}
