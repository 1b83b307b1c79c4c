// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Windows spooler: opens a device context on the default printer and draws
// the image as a DIB into a fixed target rectangle.

use std::ffi::OsStr;
use std::os::windows::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::ptr;

use async_trait::async_trait;
use tracing::{debug, info};
use windows_sys::Win32::Graphics::Gdi::{
    BI_RGB, BITMAPINFO, BITMAPINFOHEADER, CreateDCW, DIB_RGB_COLORS, DeleteDC, HDC, RGBQUAD,
    SRCCOPY, StretchDIBits,
};
use windows_sys::Win32::Graphics::Printing::GetDefaultPrinterW;
use windows_sys::Win32::Storage::Xps::{
    AbortDoc, DOCINFOW, EndDoc, EndPage, StartDocW, StartPage,
};

use barebox_core::error::{BareboxError, Result};

use super::Printer;

/// Target rectangle (left, top, right, bottom) in printer device units.
const TARGET_RECT: (i32, i32, i32, i32) = (1, 1, 1219, 1829);

pub struct WindowsSpooler;

#[async_trait]
impl Printer for WindowsSpooler {
    fn name(&self) -> &str {
        "windows-gdi"
    }

    async fn print(&self, path: &Path) -> Result<()> {
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || print_bitmap(&path))
            .await
            .map_err(|e| BareboxError::Spooler(format!("print task failed: {e}")))?
    }
}

/// Owned printer device context, deleted on drop.
struct PrinterDc(HDC);

impl Drop for PrinterDc {
    fn drop(&mut self) {
        // SAFETY: the handle came from CreateDCW and is deleted exactly once.
        unsafe {
            DeleteDC(self.0);
        }
    }
}

fn wide(s: &OsStr) -> Vec<u16> {
    s.encode_wide().chain(Some(0)).collect()
}

/// NUL-terminated name of the default printer.
fn default_printer() -> Result<Vec<u16>> {
    let mut len: u32 = 0;
    // SAFETY: a null buffer asks for the required length.
    unsafe {
        GetDefaultPrinterW(ptr::null_mut(), &mut len);
    }
    if len == 0 {
        return Err(BareboxError::Spooler("no default printer configured".into()));
    }

    let mut name = vec![0u16; len as usize];
    // SAFETY: `name` holds `len` UTF-16 units.
    let ok = unsafe { GetDefaultPrinterW(name.as_mut_ptr(), &mut len) };
    if ok == 0 {
        return Err(BareboxError::Spooler("cannot query default printer".into()));
    }
    Ok(name)
}

fn print_bitmap(path: &Path) -> Result<()> {
    debug!(path = %path.display(), "printing on windows system");

    let printer = default_printer()?;
    let bitmap = image::open(path)
        .map_err(|e| BareboxError::Spooler(format!("cannot decode {}: {e}", path.display())))?
        .to_rgba8();
    let (width, height) = bitmap.dimensions();

    // GDI expects BGRA.
    let mut pixels = bitmap.into_raw();
    for px in pixels.chunks_exact_mut(4) {
        px.swap(0, 2);
    }

    // SAFETY: `printer` is NUL-terminated and outlives the call.
    let hdc = unsafe { CreateDCW(ptr::null(), printer.as_ptr(), ptr::null(), ptr::null()) };
    if hdc.is_null() {
        return Err(BareboxError::Spooler("cannot open printer device context".into()));
    }
    let dc = PrinterDc(hdc);

    let doc_name = wide(path.as_os_str());
    let doc = DOCINFOW {
        cbSize: std::mem::size_of::<DOCINFOW>() as i32,
        lpszDocName: doc_name.as_ptr(),
        lpszOutput: ptr::null(),
        lpszDatatype: ptr::null(),
        fwType: 0,
    };

    // SAFETY: `dc` is a live printer DC and `doc` points at valid strings.
    if unsafe { StartDocW(dc.0, &doc) } <= 0 {
        return Err(BareboxError::Spooler("StartDoc failed".into()));
    }
    // SAFETY: as above.
    if unsafe { StartPage(dc.0) } <= 0 {
        // SAFETY: the document was started on this DC; nothing is spooled.
        unsafe {
            AbortDoc(dc.0);
        }
        return Err(BareboxError::Spooler("StartPage failed".into()));
    }

    let info = BITMAPINFO {
        bmiHeader: BITMAPINFOHEADER {
            biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
            biWidth: width as i32,
            // Negative height: rows are top-down.
            biHeight: -(height as i32),
            biPlanes: 1,
            biBitCount: 32,
            biCompression: BI_RGB,
            biSizeImage: 0,
            biXPelsPerMeter: 0,
            biYPelsPerMeter: 0,
            biClrUsed: 0,
            biClrImportant: 0,
        },
        bmiColors: [RGBQUAD {
            rgbBlue: 0,
            rgbGreen: 0,
            rgbRed: 0,
            rgbReserved: 0,
        }],
    };

    let (left, top, right, bottom) = TARGET_RECT;
    // SAFETY: `pixels` holds width * height BGRA quads as described by `info`.
    let drawn = unsafe {
        StretchDIBits(
            dc.0,
            left,
            top,
            right - left,
            bottom - top,
            0,
            0,
            width as i32,
            height as i32,
            pixels.as_ptr().cast(),
            &info,
            DIB_RGB_COLORS,
            SRCCOPY,
        )
    };

    if drawn == 0 {
        // SAFETY: page and document were started above; an empty page must
        // not reach the spooler.
        unsafe {
            AbortDoc(dc.0);
        }
        return Err(BareboxError::Spooler("StretchDIBits drew nothing".into()));
    }

    // SAFETY: page and document were started above.
    let (page_ended, doc_ended) = unsafe { (EndPage(dc.0), EndDoc(dc.0)) };
    if page_ended <= 0 || doc_ended <= 0 {
        return Err(BareboxError::Spooler("EndPage/EndDoc failed".into()));
    }

    info!(path = %path.display(), "bitmap sent to default printer");
    Ok(())
}
