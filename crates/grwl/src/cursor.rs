use geometry::{Point, Px};
use structures::Handle;

use crate::{
    error::{raise, report, ErrorCode, Result},
    image::Image,
    window::WindowId,
    Library,
};

pub type CursorId = Handle<Cursor>;

/// System cursor shapes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CursorShape {
    Arrow,
    IBeam,
    Crosshair,
    PointingHand,
    ResizeEw,
    ResizeNs,
    ResizeNwse,
    ResizeNesw,
    ResizeAll,
    NotAllowed,
}

/// What a cursor looks like.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CursorKind {
    Standard(CursorShape),
    Custom {
        image: Image,
        /// Offset of the cursor's click point from the image's top-left
        /// corner.
        hotspot: Point<i32, Px>,
    },
}

pub struct Cursor {
    kind: CursorKind,
}

impl Cursor {
    #[must_use]
    pub fn kind(&self) -> &CursorKind {
        &self.kind
    }
}

impl Library {
    /// Creates a cursor from an image. The hotspot may lie outside the image.
    pub fn create_cursor(&mut self, image: &Image, hotspot: Point<i32, Px>) -> Result<CursorId> {
        self.require_init()?;

        let id = self.cursors.insert(Cursor {
            kind: CursorKind::Custom {
                image: image.clone(),
                hotspot,
            },
        });

        if let Err(e) = self.platform.create_cursor(id, image, hotspot) {
            self.cursors.remove(id);
            return Err(report(e));
        }

        Ok(id)
    }

    /// Creates a cursor with a system-provided shape. Fails with
    /// [`ErrorCode::CursorUnavailable`] if the platform lacks the shape.
    pub fn create_standard_cursor(&mut self, shape: CursorShape) -> Result<CursorId> {
        self.require_init()?;

        let id = self.cursors.insert(Cursor {
            kind: CursorKind::Standard(shape),
        });

        if let Err(e) = self.platform.create_standard_cursor(id, shape) {
            self.cursors.remove(id);
            return Err(report(e));
        }

        Ok(id)
    }

    /// Destroys a cursor. Windows using it revert to the default cursor.
    pub fn destroy_cursor(&mut self, cursor: CursorId) -> Result<()> {
        self.require_init()?;
        if !self.cursors.contains(cursor) {
            return Err(raise(
                ErrorCode::InvalidValue,
                format!("{cursor:?} is not a live cursor"),
            ));
        }

        let users: Vec<WindowId> = self
            .windows
            .iter()
            .filter(|(_, w)| w.cursor == Some(cursor))
            .map(|(id, _)| id)
            .collect();

        for window in users {
            self.set_window_cursor(window, None)?;
        }

        self.platform.destroy_cursor(cursor);
        self.cursors.remove(cursor);
        Ok(())
    }

    pub fn cursor(&self, cursor: CursorId) -> Result<&Cursor> {
        self.require_init()?;
        self.cursors.get(cursor).ok_or_else(|| {
            raise(
                ErrorCode::InvalidValue,
                format!("{cursor:?} is not a live cursor"),
            )
        })
    }

    /// Sets the cursor shown over the window's content area. `None` reverts
    /// to the default arrow.
    pub fn set_window_cursor(&mut self, window: WindowId, cursor: Option<CursorId>) -> Result<()> {
        if let Some(cursor) = cursor {
            self.cursor(cursor)?;
        }

        self.window_mut(window)?.cursor = cursor;
        self.platform.set_window_cursor(window, cursor);
        Ok(())
    }

    pub fn window_cursor(&self, window: WindowId) -> Result<Option<CursorId>> {
        Ok(self.window(window)?.cursor)
    }

    pub(crate) fn destroy_all_cursors(&mut self) {
        for cursor in self.cursors.handles() {
            self.platform.destroy_cursor(cursor);
            self.cursors.remove(cursor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use geometry::Extent;

    use crate::{hints::WindowHints, platform::null::NullPlatform};

    #[test]
    fn destroying_a_cursor_reverts_windows() {
        let (platform, controller) = NullPlatform::new();
        let mut lib = Library::new(platform);
        lib.init().unwrap();

        let hints = WindowHints::no_api();
        let a = lib.create_window(Extent::new(100, 100), "a", None, &hints).unwrap();
        let b = lib.create_window(Extent::new(100, 100), "b", None, &hints).unwrap();

        let image = Image::from_rgba(2, 2, &[255; 16]).unwrap();
        let cursor = lib.create_cursor(&image, Point::new(1, 1)).unwrap();
        let hand = lib.create_standard_cursor(CursorShape::PointingHand).unwrap();

        lib.set_window_cursor(a, Some(cursor)).unwrap();
        lib.set_window_cursor(b, Some(hand)).unwrap();
        assert_eq!(controller.window_cursor(a), Some(cursor));

        lib.destroy_cursor(cursor).unwrap();
        assert_eq!(lib.window_cursor(a).unwrap(), None);
        assert_eq!(controller.window_cursor(a), None);
        assert_eq!(lib.window_cursor(b).unwrap(), Some(hand));

        let err = lib.set_window_cursor(a, Some(cursor)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidValue);
        let err = lib.destroy_cursor(cursor).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidValue);
    }

    #[test]
    fn missing_standard_shape() {
        let (platform, controller) = NullPlatform::new();
        controller.set_standard_cursors(&[CursorShape::Arrow]);

        let mut lib = Library::new(platform);
        lib.init().unwrap();

        assert!(lib.create_standard_cursor(CursorShape::Arrow).is_ok());
        let err = lib.create_standard_cursor(CursorShape::ResizeAll).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CursorUnavailable);
    }
}
