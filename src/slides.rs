//! Organizational-structure slide deck, written as a PresentationML (`.pptx`)
//! package.
//!
//! The deck has a title slide, a statistics slide and one slide per
//! department. Only the parts a presentation viewer needs are emitted: one
//! blank layout on one master, a theme, and one text-box pair per slide.

use crate::analytics::{DepartmentOverview, department_overview};
use crate::error::Result;
use crate::store::View;
use chrono::NaiveDate;
use quick_xml::escape::escape;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

// 4:3 slide in EMU
const SLIDE_CX: i64 = 9_144_000;
const SLIDE_CY: i64 = 6_858_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Slide {
    pub title: String,
    pub lines: Vec<String>,
}

/// Slides describing the departments of `view`
pub fn outline(view: &View, today: NaiveDate) -> Vec<Slide> {
    let departments = department_overview(view, today);
    let mut slides = vec![
        Slide {
            title: "الهيكل التنظيمي".to_string(),
            lines: Vec::new(),
        },
        stats_slide(view.len(), &departments),
    ];
    slides.extend(departments.iter().map(department_slide));
    slides
}

fn stats_slide(total: usize, departments: &[DepartmentOverview]) -> Slide {
    let mut lines = vec![
        format!("• إجمالي عدد الموظفين: {total}"),
        format!("• عدد الإدارات: {}", departments.len()),
    ];
    // first maximum wins so ties keep first-seen order
    let largest = departments
        .iter()
        .fold(None::<&DepartmentOverview>, |best, d| match best {
            Some(b) if b.employees >= d.employees => Some(b),
            _ => Some(d),
        });
    if let Some(d) = largest {
        lines.push(format!("• أكبر إدارة: {} ({} موظف)", d.department, d.employees));
    }
    Slide {
        title: "إحصائيات الموظفين".to_string(),
        lines,
    }
}

fn department_slide(d: &DepartmentOverview) -> Slide {
    let mut lines = vec![
        format!("• عدد الموظفين: {}", d.employees),
        "• الفئات الوظيفية:".to_string(),
    ];
    lines.extend(
        d.job_categories
            .iter()
            .map(|(category, n)| format!("  - {category}: {n} موظف")),
    );
    Slide {
        title: format!("إدارة {}", d.department),
        lines,
    }
}

/// Build the deck for `view` and package it
pub fn build(view: &View, today: NaiveDate) -> Result<Vec<u8>> {
    render(&outline(view, today))
}

/// Package slides into `.pptx` bytes
pub fn render(slides: &[Slide]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut put = |name: &str, body: String| -> Result<()> {
        zip.start_file(name, options)?;
        zip.write_all(body.as_bytes())?;
        Ok(())
    };

    put("[Content_Types].xml", content_types(slides.len()))?;
    put(
        "_rels/.rels",
        relationships(&[("rId1", "officeDocument", "ppt/presentation.xml")]),
    )?;
    put("ppt/presentation.xml", presentation(slides.len()))?;

    let mut rels = vec![
        ("rId1".to_string(), "slideMaster", "slideMasters/slideMaster1.xml".to_string()),
        ("rId2".to_string(), "theme", "theme/theme1.xml".to_string()),
    ];
    rels.extend((1..=slides.len()).map(|n| {
        (format!("rId{}", n + 2), "slide", format!("slides/slide{n}.xml"))
    }));
    let rels: Vec<(&str, &str, &str)> = rels
        .iter()
        .map(|(id, kind, target)| (id.as_str(), *kind, target.as_str()))
        .collect();
    put("ppt/_rels/presentation.xml.rels", relationships(&rels))?;

    put("ppt/slideMasters/slideMaster1.xml", slide_master())?;
    put(
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        relationships(&[
            ("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
            ("rId2", "theme", "../theme/theme1.xml"),
        ]),
    )?;
    put("ppt/slideLayouts/slideLayout1.xml", slide_layout())?;
    put(
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
        relationships(&[("rId1", "slideMaster", "../slideMasters/slideMaster1.xml")]),
    )?;
    put("ppt/theme/theme1.xml", theme())?;

    for (i, slide) in slides.iter().enumerate() {
        let n = i + 1;
        put(&format!("ppt/slides/slide{n}.xml"), slide_xml(slide))?;
        put(
            &format!("ppt/slides/_rels/slide{n}.xml.rels"),
            relationships(&[("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml")]),
        )?;
    }

    Ok(zip.finish()?.into_inner())
}

fn content_types(slides: usize) -> String {
    let pml = "application/vnd.openxmlformats-officedocument.presentationml";
    let mut xml = format!(
        r#"{XML_DECL}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/ppt/presentation.xml" ContentType="{pml}.presentation.main+xml"/><Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="{pml}.slideMaster+xml"/><Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="{pml}.slideLayout+xml"/><Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>"#
    );
    for n in 1..=slides {
        xml.push_str(&format!(
            r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="{pml}.slide+xml"/>"#
        ));
    }
    xml.push_str("</Types>");
    xml
}

fn relationships(rels: &[(&str, &str, &str)]) -> String {
    let mut xml = format!(r#"{XML_DECL}<Relationships xmlns="{REL_NS}">"#);
    for (id, kind, target) in rels {
        xml.push_str(&format!(
            r#"<Relationship Id="{id}" Type="{REL_TYPE}/{kind}" Target="{target}"/>"#
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

fn presentation(slides: usize) -> String {
    let ids: String = (1..=slides)
        .map(|n| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + n, n + 2))
        .collect();
    format!(
        r#"{XML_DECL}<p:presentation {NS}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{ids}</p:sldIdLst><p:sldSz cx="{SLIDE_CX}" cy="{SLIDE_CY}"/><p:notesSz cx="{SLIDE_CY}" cy="{SLIDE_CX}"/></p:presentation>"#
    )
}

const EMPTY_TREE: &str = r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>"#;

fn slide_master() -> String {
    format!(
        r#"{XML_DECL}<p:sldMaster {NS}><p:cSld><p:spTree>{EMPTY_TREE}</p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst></p:sldMaster>"#
    )
}

fn slide_layout() -> String {
    format!(
        r#"{XML_DECL}<p:sldLayout {NS} type="blank" preserve="1"><p:cSld name="Blank"><p:spTree>{EMPTY_TREE}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#
    )
}

fn theme() -> String {
    let colors = [
        ("dk1", "000000"),
        ("lt1", "FFFFFF"),
        ("dk2", "1F3A5F"),
        ("lt2", "E9ECF0"),
        ("accent1", "0E4C92"),
        ("accent2", "2CA02C"),
        ("accent3", "FF7F0E"),
        ("accent4", "6A0DAD"),
        ("accent5", "DC3545"),
        ("accent6", "FFC107"),
        ("hlink", "0563C1"),
        ("folHlink", "954F72"),
    ];
    let scheme: String = colors
        .iter()
        .map(|(name, rgb)| format!(r#"<a:{name}><a:srgbClr val="{rgb}"/></a:{name}>"#))
        .collect();
    let fill = r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#;
    let line = r#"<a:ln w="9525"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#;
    let effect = "<a:effectStyle><a:effectLst/></a:effectStyle>";
    format!(
        r#"{XML_DECL}<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office"><a:themeElements><a:clrScheme name="Office">{scheme}</a:clrScheme><a:fontScheme name="Office"><a:majorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface="Arial"/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface="Arial"/></a:minorFont></a:fontScheme><a:fmtScheme name="Office"><a:fillStyleLst>{fill}{fill}{fill}</a:fillStyleLst><a:lnStyleLst>{line}{line}{line}</a:lnStyleLst><a:effectStyleLst>{effect}{effect}{effect}</a:effectStyleLst><a:bgFillStyleLst>{fill}{fill}{fill}</a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>"#
    )
}

fn slide_xml(slide: &Slide) -> String {
    let margin = 457_200;
    let title = text_box(
        2,
        "Title",
        (margin, margin, SLIDE_CX - 2 * margin, 1_143_000),
        std::slice::from_ref(&slide.title),
        3200,
        true,
    );
    let body = text_box(
        3,
        "Body",
        (margin, 1_828_800, SLIDE_CX - 2 * margin, SLIDE_CY - 2_286_000),
        &slide.lines,
        2000,
        false,
    );
    format!(
        r#"{XML_DECL}<p:sld {NS}><p:cSld><p:spTree>{EMPTY_TREE}{title}{body}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#
    )
}

/// A right-to-left text box, one paragraph per line
fn text_box(
    id: u32,
    name: &str,
    (x, y, cx, cy): (i64, i64, i64, i64),
    lines: &[String],
    size: u32,
    bold: bool,
) -> String {
    let b = if bold { r#" b="1""# } else { "" };
    let paragraphs: String = if lines.is_empty() {
        r#"<a:p><a:pPr algn="r" rtl="1"/></a:p>"#.to_string()
    } else {
        lines
            .iter()
            .map(|line| {
                format!(
                    r#"<a:p><a:pPr algn="r" rtl="1"/><a:r><a:rPr lang="ar-SA" sz="{size}"{b}/><a:t>{}</a:t></a:r></a:p>"#,
                    escape(line.as_str())
                )
            })
            .collect()
    };
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr><p:txBody><a:bodyPr wrap="square" rtlCol="1"/><a:lstStyle/>{paragraphs}</p:txBody></p:sp>"#
    )
}
