//! PPTX package writer.
//!
//! Serialises [`SlideCanvas`]es into an Office Open XML presentation: a ZIP
//! archive of XML parts tied together by relationship files.

use crate::canvas::{
    Align, Anchor, Bullet, DrawCall, Paragraph, ShapeKind, SlideCanvas, TableRow, TextBox, TextRun,
};
use crate::geometry::{Rect, SLIDE_HEIGHT, SLIDE_WIDTH};
use quick_xml::escape::escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use slidemark_core::theme::normalize_hex;
use slidemark_core::{ChartData, ChartType, Error, Result, Theme};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::io::{Cursor, Seek, Write};
use std::time::{SystemTime, UNIX_EPOCH};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const NS_DRAWING: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PRESENTATION: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const NS_CHART: &str = "http://schemas.openxmlformats.org/drawingml/2006/chart";
const NS_PACKAGE_RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

const REL_OFFICE_DOCUMENT: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_CORE_PROPERTIES: &str = "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
const REL_EXTENDED_PROPERTIES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";
const REL_SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const REL_SLIDE_MASTER: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
const REL_SLIDE_LAYOUT: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
const REL_NOTES_MASTER: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesMaster";
const REL_NOTES_SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide";
const REL_THEME: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
const REL_PRES_PROPS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/presProps";
const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
const REL_CHART: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/chart";
const REL_HYPERLINK: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";

const CT_SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
const CT_NOTES_SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.notesSlide+xml";
const CT_CHART: &str = "application/vnd.openxmlformats-officedocument.drawingml.chart+xml";

/// Bullet indent per list level.
const LIST_INDENT: i64 = 342_900;

fn zip_err(e: zip::result::ZipError) -> Error {
    Error::ZipError(e.to_string())
}

fn xml_err(e: quick_xml::Error) -> Error {
    Error::XmlError(e.to_string())
}

/// One entry of a `.rels` part.
#[derive(Debug, Clone)]
struct Relationship {
    id: String,
    rel_type: &'static str,
    target: String,
    external: bool,
}

/// Relationships of one part, numbered from `rId1`.
#[derive(Debug, Default)]
struct RelationshipTable {
    entries: Vec<Relationship>,
}

impl RelationshipTable {
    fn add(&mut self, rel_type: &'static str, target: impl Into<String>) -> String {
        self.push(rel_type, target.into(), false)
    }

    fn add_external(&mut self, rel_type: &'static str, target: impl Into<String>) -> String {
        self.push(rel_type, target.into(), true)
    }

    fn push(&mut self, rel_type: &'static str, target: String, external: bool) -> String {
        let id = format!("rId{}", self.entries.len() + 1);
        self.entries.push(Relationship {
            id: id.clone(),
            rel_type,
            target,
            external,
        });
        id
    }

    fn to_xml(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
            .map_err(xml_err)?;
        let mut root = BytesStart::new("Relationships");
        root.push_attribute(("xmlns", NS_PACKAGE_RELS));
        writer.write_event(Event::Start(root)).map_err(xml_err)?;
        for rel in &self.entries {
            let mut element = BytesStart::new("Relationship");
            element.push_attribute(("Id", rel.id.as_str()));
            element.push_attribute(("Type", rel.rel_type));
            element.push_attribute(("Target", rel.target.as_str()));
            if rel.external {
                element.push_attribute(("TargetMode", "External"));
            }
            writer.write_event(Event::Empty(element)).map_err(xml_err)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("Relationships")))
            .map_err(xml_err)?;
        Ok(writer.into_inner())
    }
}

/// A slide serialised to XML, with the parts it references.
struct SlidePart {
    xml: String,
    rels: RelationshipTable,
    media: Vec<(String, Vec<u8>)>,
    charts: Vec<(String, String)>,
}

/// Builds the `.pptx` package for a deck.
pub struct PptxWriter<'a> {
    theme: &'a Theme,
    title: Option<String>,
    author: Option<String>,
    slides: Vec<SlideCanvas>,
}

impl<'a> PptxWriter<'a> {
    pub fn new(theme: &'a Theme) -> Self {
        Self {
            theme,
            title: None,
            author: None,
            slides: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn add_slide(&mut self, slide: SlideCanvas) {
        self.slides.push(slide);
    }

    pub fn add_slides(&mut self, slides: impl IntoIterator<Item = SlideCanvas>) {
        self.slides.extend(slides);
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    /// Generate the PPTX as bytes.
    pub fn generate(&self) -> Result<Vec<u8>> {
        let cursor = self.write_to(Cursor::new(Vec::new()))?;
        Ok(cursor.into_inner())
    }

    /// Write the package into `sink`, returning it when finished.
    pub fn write_to<W: Write + Seek>(&self, sink: W) -> Result<W> {
        let mut zip = ZipWriter::new(sink);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut media_count = 0;
        let mut chart_count = 0;
        let parts: Vec<SlidePart> = self
            .slides
            .iter()
            .enumerate()
            .map(|(i, slide)| slide_part(i + 1, slide, &mut media_count, &mut chart_count))
            .collect();

        self.write_content_types(&mut zip, options, &parts)?;
        self.write_root_rels(&mut zip, options)?;
        self.write_app_xml(&mut zip, options)?;
        self.write_core_xml(&mut zip, options)?;
        self.write_presentation_xml(&mut zip, options)?;
        self.write_presentation_rels(&mut zip, options)?;
        self.write_pres_props(&mut zip, options)?;
        self.write_theme(&mut zip, options, "ppt/theme/theme1.xml")?;
        self.write_theme(&mut zip, options, "ppt/theme/theme2.xml")?;
        self.write_slide_master(&mut zip, options)?;
        self.write_slide_layout(&mut zip, options)?;
        self.write_notes_master(&mut zip, options)?;

        let media_options = FileOptions::default().compression_method(CompressionMethod::Stored);
        for (i, (slide, part)) in self.slides.iter().zip(&parts).enumerate() {
            let number = i + 1;
            write_part(
                &mut zip,
                options,
                &format!("ppt/slides/slide{}.xml", number),
                part.xml.as_bytes(),
            )?;
            write_part(
                &mut zip,
                options,
                &format!("ppt/slides/_rels/slide{}.xml.rels", number),
                &part.rels.to_xml()?,
            )?;
            for (name, data) in &part.media {
                write_part(&mut zip, media_options, &format!("ppt/media/{}", name), data)?;
            }
            for (name, xml) in &part.charts {
                write_part(&mut zip, options, &format!("ppt/charts/{}", name), xml.as_bytes())?;
            }
            if let Some(notes) = slide.notes.as_deref().filter(|n| !n.trim().is_empty()) {
                self.write_notes_slide(&mut zip, options, number, notes)?;
            }
        }

        zip.finish().map_err(zip_err)
    }

    fn has_notes(&self, slide: &SlideCanvas) -> bool {
        slide.notes.as_deref().is_some_and(|n| !n.trim().is_empty())
    }

    /// Write [Content_Types].xml
    fn write_content_types<W: Write + Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        options: FileOptions,
        parts: &[SlidePart],
    ) -> Result<()> {
        let mut writer = Writer::new(Vec::new());
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
            .map_err(xml_err)?;
        let mut types = BytesStart::new("Types");
        types.push_attribute(("xmlns", NS_CONTENT_TYPES));
        writer.write_event(Event::Start(types)).map_err(xml_err)?;

        let mut defaults: BTreeSet<(String, String)> = [
            ("rels", "application/vnd.openxmlformats-package.relationships+xml"),
            ("xml", "application/xml"),
        ]
        .iter()
        .map(|(e, t)| (e.to_string(), t.to_string()))
        .collect();
        for (name, _) in parts.iter().flat_map(|p| &p.media) {
            if let Some(ext) = name.rsplit('.').next() {
                defaults.insert((ext.to_string(), format!("image/{}", ext)));
            }
        }
        for (extension, content_type) in &defaults {
            let mut element = BytesStart::new("Default");
            element.push_attribute(("Extension", extension.as_str()));
            element.push_attribute(("ContentType", content_type.as_str()));
            writer.write_event(Event::Empty(element)).map_err(xml_err)?;
        }

        let mut overrides: Vec<(String, &str)> = vec![
            (
                "/ppt/presentation.xml".to_string(),
                "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml",
            ),
            (
                "/ppt/presProps.xml".to_string(),
                "application/vnd.openxmlformats-officedocument.presentationml.presProps+xml",
            ),
            (
                "/ppt/theme/theme1.xml".to_string(),
                "application/vnd.openxmlformats-officedocument.theme+xml",
            ),
            (
                "/ppt/theme/theme2.xml".to_string(),
                "application/vnd.openxmlformats-officedocument.theme+xml",
            ),
            (
                "/ppt/slideMasters/slideMaster1.xml".to_string(),
                "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml",
            ),
            (
                "/ppt/slideLayouts/slideLayout1.xml".to_string(),
                "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml",
            ),
            (
                "/ppt/notesMasters/notesMaster1.xml".to_string(),
                "application/vnd.openxmlformats-officedocument.presentationml.notesMaster+xml",
            ),
            (
                "/docProps/core.xml".to_string(),
                "application/vnd.openxmlformats-package.core-properties+xml",
            ),
            (
                "/docProps/app.xml".to_string(),
                "application/vnd.openxmlformats-officedocument.extended-properties+xml",
            ),
        ];
        for (i, (slide, part)) in self.slides.iter().zip(parts).enumerate() {
            overrides.push((format!("/ppt/slides/slide{}.xml", i + 1), CT_SLIDE));
            if self.has_notes(slide) {
                overrides.push((
                    format!("/ppt/notesSlides/notesSlide{}.xml", i + 1),
                    CT_NOTES_SLIDE,
                ));
            }
            for (name, _) in &part.charts {
                overrides.push((format!("/ppt/charts/{}", name), CT_CHART));
            }
        }
        for (part_name, content_type) in &overrides {
            let mut element = BytesStart::new("Override");
            element.push_attribute(("PartName", part_name.as_str()));
            element.push_attribute(("ContentType", *content_type));
            writer.write_event(Event::Empty(element)).map_err(xml_err)?;
        }
        writer.write_event(Event::End(BytesEnd::new("Types"))).map_err(xml_err)?;

        write_part(zip, options, "[Content_Types].xml", &writer.into_inner())
    }

    /// Write _rels/.rels
    fn write_root_rels<W: Write + Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        options: FileOptions,
    ) -> Result<()> {
        let mut rels = RelationshipTable::default();
        rels.add(REL_OFFICE_DOCUMENT, "ppt/presentation.xml");
        rels.add(REL_CORE_PROPERTIES, "docProps/core.xml");
        rels.add(REL_EXTENDED_PROPERTIES, "docProps/app.xml");
        write_part(zip, options, "_rels/.rels", &rels.to_xml()?)
    }

    /// Write docProps/app.xml
    fn write_app_xml<W: Write + Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        options: FileOptions,
    ) -> Result<()> {
        let notes = self.slides.iter().filter(|s| self.has_notes(s)).count();
        let content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">
  <TotalTime>0</TotalTime>
  <Application>slidemark</Application>
  <PresentationFormat>Widescreen</PresentationFormat>
  <Slides>{}</Slides>
  <Notes>{}</Notes>
  <HiddenSlides>0</HiddenSlides>
  <ScaleCrop>false</ScaleCrop>
  <LinksUpToDate>false</LinksUpToDate>
  <SharedDoc>false</SharedDoc>
  <AppVersion>1.0</AppVersion>
</Properties>"#,
            self.slides.len(),
            notes
        );
        write_part(zip, options, "docProps/app.xml", content.as_bytes())
    }

    /// Write docProps/core.xml
    fn write_core_xml<W: Write + Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        options: FileOptions,
    ) -> Result<()> {
        let title = self.title.as_deref().unwrap_or("Presentation");
        let author = self.author.as_deref().unwrap_or("slidemark");
        let now = w3c_timestamp(SystemTime::now());
        let content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <dc:title>{title}</dc:title>
  <dc:creator>{author}</dc:creator>
  <cp:lastModifiedBy>{author}</cp:lastModifiedBy>
  <dcterms:created xsi:type="dcterms:W3CDTF">{now}</dcterms:created>
  <dcterms:modified xsi:type="dcterms:W3CDTF">{now}</dcterms:modified>
</cp:coreProperties>"#,
            title = escape(title),
            author = escape(author),
        );
        write_part(zip, options, "docProps/core.xml", content.as_bytes())
    }

    /// Write ppt/presentation.xml
    ///
    /// Relationship ids: rId1 master, rId2 presProps, rId3 theme, rId4 notes
    /// master, then one per slide.
    fn write_presentation_xml<W: Write + Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        options: FileOptions,
    ) -> Result<()> {
        let mut slide_ids = String::new();
        for i in 1..=self.slides.len() {
            let _ = writeln!(slide_ids, "    <p:sldId id=\"{}\" r:id=\"rId{}\"/>", 255 + i, i + 4);
        }
        let content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation xmlns:a="{NS_DRAWING}" xmlns:r="{NS_RELATIONSHIPS}" xmlns:p="{NS_PRESENTATION}" saveSubsetFonts="1">
  <p:sldMasterIdLst>
    <p:sldMasterId id="2147483648" r:id="rId1"/>
  </p:sldMasterIdLst>
  <p:notesMasterIdLst>
    <p:notesMasterId r:id="rId4"/>
  </p:notesMasterIdLst>
  <p:sldIdLst>
{slide_ids}  </p:sldIdLst>
  <p:sldSz cx="{SLIDE_WIDTH}" cy="{SLIDE_HEIGHT}"/>
  <p:notesSz cx="{SLIDE_HEIGHT}" cy="{SLIDE_WIDTH}"/>
</p:presentation>"#
        );
        write_part(zip, options, "ppt/presentation.xml", content.as_bytes())
    }

    /// Write ppt/_rels/presentation.xml.rels
    fn write_presentation_rels<W: Write + Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        options: FileOptions,
    ) -> Result<()> {
        let mut rels = RelationshipTable::default();
        rels.add(REL_SLIDE_MASTER, "slideMasters/slideMaster1.xml");
        rels.add(REL_PRES_PROPS, "presProps.xml");
        rels.add(REL_THEME, "theme/theme1.xml");
        rels.add(REL_NOTES_MASTER, "notesMasters/notesMaster1.xml");
        for i in 1..=self.slides.len() {
            rels.add(REL_SLIDE, format!("slides/slide{}.xml", i));
        }
        write_part(zip, options, "ppt/_rels/presentation.xml.rels", &rels.to_xml()?)
    }

    /// Write ppt/presProps.xml
    fn write_pres_props<W: Write + Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        options: FileOptions,
    ) -> Result<()> {
        let content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentationPr xmlns:a="{NS_DRAWING}" xmlns:r="{NS_RELATIONSHIPS}" xmlns:p="{NS_PRESENTATION}"/>"#
        );
        write_part(zip, options, "ppt/presProps.xml", content.as_bytes())
    }

    /// Write a theme part carrying the deck's colours and fonts.
    fn write_theme<W: Write + Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        options: FileOptions,
        path: &str,
    ) -> Result<()> {
        let theme = self.theme;
        let hex = |color: &str, fallback: &str| {
            normalize_hex(color).unwrap_or_else(|| fallback.to_string())
        };
        let mut accents: Vec<String> = vec![
            hex(&theme.accent_color, "4472C4"),
            hex(&theme.secondary_color, "ED7D31"),
        ];
        accents.extend(theme.mesh_colors.iter().skip(1).filter_map(|c| normalize_hex(c)));
        for fallback in ["A5A5A5", "FFC000", "5B9BD5", "70AD47"] {
            accents.push(fallback.to_string());
        }
        let light = normalize_hex(&theme.background).unwrap_or_else(|| "FFFFFF".to_string());

        let content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="{NS_DRAWING}" name="{name}">
  <a:themeElements>
    <a:clrScheme name="{name}">
      <a:dk1><a:srgbClr val="000000"/></a:dk1>
      <a:lt1><a:srgbClr val="FFFFFF"/></a:lt1>
      <a:dk2><a:srgbClr val="{dk2}"/></a:dk2>
      <a:lt2><a:srgbClr val="{light}"/></a:lt2>
      <a:accent1><a:srgbClr val="{a1}"/></a:accent1>
      <a:accent2><a:srgbClr val="{a2}"/></a:accent2>
      <a:accent3><a:srgbClr val="{a3}"/></a:accent3>
      <a:accent4><a:srgbClr val="{a4}"/></a:accent4>
      <a:accent5><a:srgbClr val="{a5}"/></a:accent5>
      <a:accent6><a:srgbClr val="{a6}"/></a:accent6>
      <a:hlink><a:srgbClr val="{a1}"/></a:hlink>
      <a:folHlink><a:srgbClr val="{a2}"/></a:folHlink>
    </a:clrScheme>
    <a:fontScheme name="{name}">
      <a:majorFont><a:latin typeface="{major}"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont>
      <a:minorFont><a:latin typeface="{minor}"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont>
    </a:fontScheme>
    <a:fmtScheme name="{name}">
      <a:fillStyleLst>
        <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
        <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
        <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
      </a:fillStyleLst>
      <a:lnStyleLst>
        <a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>
        <a:ln w="12700"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>
        <a:ln w="19050"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>
      </a:lnStyleLst>
      <a:effectStyleLst>
        <a:effectStyle><a:effectLst/></a:effectStyle>
        <a:effectStyle><a:effectLst/></a:effectStyle>
        <a:effectStyle><a:effectLst/></a:effectStyle>
      </a:effectStyleLst>
      <a:bgFillStyleLst>
        <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
        <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
        <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
      </a:bgFillStyleLst>
    </a:fmtScheme>
  </a:themeElements>
</a:theme>"#,
            name = escape(&theme.name),
            dk2 = hex(&theme.heading_color, "44546A"),
            a1 = accents[0],
            a2 = accents[1],
            a3 = accents[2],
            a4 = accents[3],
            a5 = accents[4],
            a6 = accents[5],
            major = escape(&theme.heading_font),
            minor = escape(&theme.font),
        );
        write_part(zip, options, path, content.as_bytes())
    }

    /// Write ppt/slideMasters/slideMaster1.xml
    fn write_slide_master<W: Write + Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        options: FileOptions,
    ) -> Result<()> {
        let content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldMaster xmlns:a="{NS_DRAWING}" xmlns:r="{NS_RELATIONSHIPS}" xmlns:p="{NS_PRESENTATION}">
  <p:cSld>
    <p:bg>
      <p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef>
    </p:bg>
    <p:spTree>
      <p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>
      <p:grpSpPr/>
    </p:spTree>
  </p:cSld>
  <p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/>
  <p:sldLayoutIdLst>
    <p:sldLayoutId id="2147483649" r:id="rId1"/>
  </p:sldLayoutIdLst>
</p:sldMaster>"#
        );
        write_part(zip, options, "ppt/slideMasters/slideMaster1.xml", content.as_bytes())?;

        let mut rels = RelationshipTable::default();
        rels.add(REL_SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml");
        rels.add(REL_THEME, "../theme/theme1.xml");
        write_part(zip, options, "ppt/slideMasters/_rels/slideMaster1.xml.rels", &rels.to_xml()?)
    }

    /// Write ppt/slideLayouts/slideLayout1.xml
    ///
    /// Every slide positions its own shapes, so a single blank layout suffices.
    fn write_slide_layout<W: Write + Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        options: FileOptions,
    ) -> Result<()> {
        let content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldLayout xmlns:a="{NS_DRAWING}" xmlns:r="{NS_RELATIONSHIPS}" xmlns:p="{NS_PRESENTATION}" type="blank" preserve="1">
  <p:cSld name="Blank">
    <p:spTree>
      <p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>
      <p:grpSpPr/>
    </p:spTree>
  </p:cSld>
  <p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>
</p:sldLayout>"#
        );
        write_part(zip, options, "ppt/slideLayouts/slideLayout1.xml", content.as_bytes())?;

        let mut rels = RelationshipTable::default();
        rels.add(REL_SLIDE_MASTER, "../slideMasters/slideMaster1.xml");
        write_part(zip, options, "ppt/slideLayouts/_rels/slideLayout1.xml.rels", &rels.to_xml()?)
    }

    /// Write ppt/notesMasters/notesMaster1.xml
    fn write_notes_master<W: Write + Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        options: FileOptions,
    ) -> Result<()> {
        let content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:notesMaster xmlns:a="{NS_DRAWING}" xmlns:r="{NS_RELATIONSHIPS}" xmlns:p="{NS_PRESENTATION}">
  <p:cSld>
    <p:bg>
      <p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef>
    </p:bg>
    <p:spTree>
      <p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>
      <p:grpSpPr/>
    </p:spTree>
  </p:cSld>
  <p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/>
</p:notesMaster>"#
        );
        write_part(zip, options, "ppt/notesMasters/notesMaster1.xml", content.as_bytes())?;

        let mut rels = RelationshipTable::default();
        rels.add(REL_THEME, "../theme/theme2.xml");
        write_part(zip, options, "ppt/notesMasters/_rels/notesMaster1.xml.rels", &rels.to_xml()?)
    }

    /// Write speaker notes for slide `number`.
    fn write_notes_slide<W: Write + Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        options: FileOptions,
        number: usize,
        notes: &str,
    ) -> Result<()> {
        let mut paragraphs = String::new();
        for line in notes.trim().lines() {
            if line.trim().is_empty() {
                paragraphs.push_str("<a:p><a:endParaRPr lang=\"en-US\"/></a:p>");
            } else {
                let _ = write!(
                    paragraphs,
                    "<a:p><a:r><a:rPr lang=\"en-US\" dirty=\"0\"/><a:t>{}</a:t></a:r></a:p>",
                    escape(line)
                );
            }
        }
        let content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:notes xmlns:a="{NS_DRAWING}" xmlns:r="{NS_RELATIONSHIPS}" xmlns:p="{NS_PRESENTATION}">
  <p:cSld>
    <p:spTree>
      <p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>
      <p:grpSpPr/>
      <p:sp>
        <p:nvSpPr>
          <p:cNvPr id="2" name="Slide Image Placeholder 1"/>
          <p:cNvSpPr><a:spLocks noGrp="1" noRot="1" noChangeAspect="1"/></p:cNvSpPr>
          <p:nvPr><p:ph type="sldImg"/></p:nvPr>
        </p:nvSpPr>
        <p:spPr/>
      </p:sp>
      <p:sp>
        <p:nvSpPr>
          <p:cNvPr id="3" name="Notes Placeholder 2"/>
          <p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr>
          <p:nvPr><p:ph type="body" idx="1"/></p:nvPr>
        </p:nvSpPr>
        <p:spPr/>
        <p:txBody><a:bodyPr/><a:lstStyle/>{paragraphs}</p:txBody>
      </p:sp>
    </p:spTree>
  </p:cSld>
</p:notes>"#
        );
        write_part(
            zip,
            options,
            &format!("ppt/notesSlides/notesSlide{}.xml", number),
            content.as_bytes(),
        )?;

        let mut rels = RelationshipTable::default();
        rels.add(REL_NOTES_MASTER, "../notesMasters/notesMaster1.xml");
        rels.add(REL_SLIDE, format!("../slides/slide{}.xml", number));
        write_part(
            zip,
            options,
            &format!("ppt/notesSlides/_rels/notesSlide{}.xml.rels", number),
            &rels.to_xml()?,
        )
    }
}

fn write_part<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    options: FileOptions,
    path: &str,
    data: &[u8],
) -> Result<()> {
    zip.start_file(path, options).map_err(zip_err)?;
    zip.write_all(data)?;
    Ok(())
}

/// Serialise one canvas, allocating media and chart part names.
fn slide_part(
    number: usize,
    slide: &SlideCanvas,
    media_count: &mut usize,
    chart_count: &mut usize,
) -> SlidePart {
    let mut rels = RelationshipTable::default();
    rels.add(REL_SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml");
    let mut media = Vec::new();
    let mut charts = Vec::new();
    let mut shapes = String::new();

    for (i, call) in slide.calls.iter().enumerate() {
        let id = i + 2;
        match call {
            DrawCall::Text(text) => shapes.push_str(&text_box_xml(id, text, &mut rels)),
            DrawCall::Shape {
                rect,
                kind,
                fill,
                opacity,
                soft_edge,
            } => shapes.push_str(&shape_xml(id, *rect, *kind, fill, *opacity, *soft_edge)),
            DrawCall::Image {
                rect,
                data,
                extension,
                description,
            } => {
                *media_count += 1;
                let name = format!("image{}.{}", media_count, extension);
                let rel = rels.add(REL_IMAGE, format!("../media/{}", name));
                media.push((name, data.clone()));
                shapes.push_str(&picture_xml(id, *rect, &rel, description));
            }
            DrawCall::Table {
                rect,
                rows,
                size_pt,
                text_color,
                header_fill,
                border,
            } => shapes.push_str(&table_xml(
                id,
                *rect,
                rows,
                *size_pt,
                text_color,
                header_fill,
                border,
                &mut rels,
            )),
            DrawCall::Chart {
                rect,
                chart_type,
                data,
                colors,
                text_color,
            } => {
                *chart_count += 1;
                let name = format!("chart{}.xml", chart_count);
                let rel = rels.add(REL_CHART, format!("../charts/{}", name));
                charts.push((name, chart_xml(*chart_type, data, colors, text_color)));
                shapes.push_str(&chart_frame_xml(id, *rect, &rel));
            }
        }
    }
    if slide.notes.as_deref().is_some_and(|n| !n.trim().is_empty()) {
        rels.add(REL_NOTES_SLIDE, format!("../notesSlides/notesSlide{}.xml", number));
    }

    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="{NS_DRAWING}" xmlns:r="{NS_RELATIONSHIPS}" xmlns:p="{NS_PRESENTATION}">
  <p:cSld>
    <p:bg><p:bgPr><a:solidFill><a:srgbClr val="{background}"/></a:solidFill><a:effectLst/></p:bgPr></p:bg>
    <p:spTree>
      <p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>
      <p:grpSpPr/>
{shapes}    </p:spTree>
  </p:cSld>
  <p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>
</p:sld>"#,
        background = escape(&slide.background),
    );
    SlidePart {
        xml,
        rels,
        media,
        charts,
    }
}

fn xfrm(rect: Rect) -> String {
    format!(
        "<a:xfrm><a:off x=\"{}\" y=\"{}\"/><a:ext cx=\"{}\" cy=\"{}\"/></a:xfrm>",
        rect.x, rect.y, rect.w, rect.h
    )
}

fn solid_fill(color: &str) -> String {
    format!("<a:solidFill><a:srgbClr val=\"{}\"/></a:solidFill>", escape(color))
}

fn text_box_xml(id: usize, text: &TextBox, rels: &mut RelationshipTable) -> String {
    let geometry = if text.rounded { "roundRect" } else { "rect" };
    let fill = text.fill.as_deref().map_or_else(|| "<a:noFill/>".to_string(), solid_fill);
    let line = match &text.outline {
        Some(color) => format!("<a:ln w=\"12700\">{}</a:ln>", solid_fill(color)),
        None => "<a:ln><a:noFill/></a:ln>".to_string(),
    };
    let anchor = match text.anchor {
        Anchor::Top => "t",
        Anchor::Middle => "ctr",
    };
    let mut paragraphs = String::new();
    for paragraph in &text.paragraphs {
        paragraphs.push_str(&paragraph_xml(paragraph, rels));
    }
    if paragraphs.is_empty() {
        paragraphs.push_str("<a:p><a:endParaRPr lang=\"en-US\"/></a:p>");
    }
    format!(
        r#"      <p:sp>
        <p:nvSpPr><p:cNvPr id="{id}" name="TextBox {id}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr>
        <p:spPr>{xfrm}<a:prstGeom prst="{geometry}"><a:avLst/></a:prstGeom>{fill}{line}</p:spPr>
        <p:txBody><a:bodyPr wrap="square" rtlCol="0" anchor="{anchor}"><a:normAutofit/></a:bodyPr><a:lstStyle/>{paragraphs}</p:txBody>
      </p:sp>
"#,
        xfrm = xfrm(text.rect),
    )
}

fn paragraph_xml(paragraph: &Paragraph, rels: &mut RelationshipTable) -> String {
    let size = (paragraph.size_pt * 100.0).round() as i64;
    let mut attrs = String::new();
    match paragraph.align {
        Align::Left => {}
        Align::Center => attrs.push_str(" algn=\"ctr\""),
        Align::Right => attrs.push_str(" algn=\"r\""),
    }
    let bullet = match paragraph.bullet {
        Some(bullet) => {
            let level = paragraph.level as i64;
            let _ = write!(
                attrs,
                " lvl=\"{}\" marL=\"{}\" indent=\"{}\"",
                level.min(8),
                LIST_INDENT * (level + 1),
                -LIST_INDENT
            );
            match bullet {
                Bullet::Char => {
                    "<a:buFont typeface=\"Arial\"/><a:buChar char=\"&#8226;\"/>".to_string()
                }
                Bullet::Number { start } => {
                    format!(
                        "<a:buFont typeface=\"+mj-lt\"/><a:buAutoNum type=\"arabicPeriod\" startAt=\"{}\"/>",
                        start.max(1)
                    )
                }
            }
        }
        None => "<a:buNone/>".to_string(),
    };

    let mut runs = String::new();
    for run in &paragraph.runs {
        runs.push_str(&run_xml(run, paragraph, size, rels));
    }
    format!(
        "<a:p><a:pPr{attrs}>{bullet}</a:pPr>{runs}<a:endParaRPr lang=\"en-US\" sz=\"{size}\" dirty=\"0\"/></a:p>"
    )
}

fn run_xml(
    run: &TextRun,
    paragraph: &Paragraph,
    size: i64,
    rels: &mut RelationshipTable,
) -> String {
    if run.text.is_empty() {
        return String::new();
    }
    let mut attrs = format!("lang=\"en-US\" sz=\"{}\"", size);
    if run.bold {
        attrs.push_str(" b=\"1\"");
    }
    if run.italic {
        attrs.push_str(" i=\"1\"");
    }
    if run.underline {
        attrs.push_str(" u=\"sng\"");
    }
    attrs.push_str(" dirty=\"0\"");

    let mut children = solid_fill(run.color.as_deref().unwrap_or(&paragraph.color));
    if let Some(highlight) = &run.highlight {
        let _ = write!(
            children,
            "<a:highlight><a:srgbClr val=\"{}\"/></a:highlight>",
            escape(highlight)
        );
    }
    if let Some(font) = run.font.as_deref().or(paragraph.font.as_deref()) {
        let _ = write!(children, "<a:latin typeface=\"{}\"/>", escape(font));
    }
    if let Some(link) = &run.link {
        let rel = rels.add_external(REL_HYPERLINK, link.clone());
        let _ = write!(children, "<a:hlinkClick r:id=\"{}\"/>", rel);
    }
    format!(
        "<a:r><a:rPr {}>{}</a:rPr><a:t>{}</a:t></a:r>",
        attrs,
        children,
        escape(&run.text)
    )
}

fn shape_xml(
    id: usize,
    rect: Rect,
    kind: ShapeKind,
    fill: &str,
    opacity: f64,
    soft_edge: i64,
) -> String {
    let geometry = match kind {
        ShapeKind::Rect => "rect",
        ShapeKind::Ellipse => "ellipse",
    };
    let alpha = (opacity.clamp(0.0, 1.0) * 100_000.0).round() as i64;
    let color = if alpha < 100_000 {
        format!("<a:srgbClr val=\"{}\"><a:alpha val=\"{}\"/></a:srgbClr>", escape(fill), alpha)
    } else {
        format!("<a:srgbClr val=\"{}\"/>", escape(fill))
    };
    let effects = if soft_edge > 0 {
        format!("<a:effectLst><a:softEdge rad=\"{}\"/></a:effectLst>", soft_edge)
    } else {
        String::new()
    };
    format!(
        r#"      <p:sp>
        <p:nvSpPr><p:cNvPr id="{id}" name="Shape {id}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr>
        <p:spPr>{xfrm}<a:prstGeom prst="{geometry}"><a:avLst/></a:prstGeom><a:solidFill>{color}</a:solidFill><a:ln><a:noFill/></a:ln>{effects}</p:spPr>
      </p:sp>
"#,
        xfrm = xfrm(rect),
    )
}

fn picture_xml(id: usize, rect: Rect, rel: &str, description: &str) -> String {
    format!(
        r#"      <p:pic>
        <p:nvPicPr><p:cNvPr id="{id}" name="Picture {id}" descr="{descr}"/><p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr>
        <p:blipFill><a:blip r:embed="{rel}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>
        <p:spPr>{xfrm}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr>
      </p:pic>
"#,
        descr = escape(description),
        xfrm = xfrm(rect),
    )
}

#[allow(clippy::too_many_arguments)]
fn table_xml(
    id: usize,
    rect: Rect,
    rows: &[TableRow],
    size_pt: f64,
    text_color: &str,
    header_fill: &str,
    border: &str,
    rels: &mut RelationshipTable,
) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(1).max(1);
    let col_w = rect.w / columns as i64;
    let row_h = rect.h / rows.len().max(1) as i64;
    let line = |side: &str| format!("<a:{side} w=\"6350\">{}</a:{side}>", solid_fill(border));
    let borders = format!("{}{}{}{}", line("lnL"), line("lnR"), line("lnT"), line("lnB"));

    let mut grid = String::new();
    for _ in 0..columns {
        let _ = write!(grid, "<a:gridCol w=\"{}\"/>", col_w);
    }
    let mut body = String::new();
    for (r, row) in rows.iter().enumerate() {
        let header = r == 0;
        let _ = write!(body, "<a:tr h=\"{}\">", row_h);
        for c in 0..columns {
            let runs: Vec<TextRun> = row.get(c).cloned().unwrap_or_default();
            let color = if header { "FFFFFF" } else { text_color };
            let mut paragraph = Paragraph::new(runs, size_pt, color);
            if header {
                for run in &mut paragraph.runs {
                    run.bold = true;
                    run.color = None;
                }
            }
            let fill = if header { solid_fill(header_fill) } else { "<a:noFill/>".to_string() };
            let _ = write!(
                body,
                "<a:tc><a:txBody><a:bodyPr/><a:lstStyle/>{}</a:txBody><a:tcPr>{}{}</a:tcPr></a:tc>",
                paragraph_xml(&paragraph, rels),
                borders,
                fill
            );
        }
        body.push_str("</a:tr>");
    }
    format!(
        r#"      <p:graphicFrame>
        <p:nvGraphicFramePr><p:cNvPr id="{id}" name="Table {id}"/><p:cNvGraphicFramePr><a:graphicFrameLocks noGrp="1"/></p:cNvGraphicFramePr><p:nvPr/></p:nvGraphicFramePr>
        <p:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{w}" cy="{h}"/></p:xfrm>
        <a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl><a:tblPr firstRow="1" bandRow="1"/><a:tblGrid>{grid}</a:tblGrid>{body}</a:tbl></a:graphicData></a:graphic>
      </p:graphicFrame>
"#,
        x = rect.x,
        y = rect.y,
        w = rect.w,
        h = rect.h,
    )
}

fn chart_frame_xml(id: usize, rect: Rect, rel: &str) -> String {
    format!(
        r#"      <p:graphicFrame>
        <p:nvGraphicFramePr><p:cNvPr id="{id}" name="Chart {id}"/><p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr>
        <p:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{w}" cy="{h}"/></p:xfrm>
        <a:graphic><a:graphicData uri="{NS_CHART}"><c:chart xmlns:c="{NS_CHART}" r:id="{rel}"/></a:graphicData></a:graphic>
      </p:graphicFrame>
"#,
        x = rect.x,
        y = rect.y,
        w = rect.w,
        h = rect.h,
    )
}

/// A chart part with literal (embedded) category and value data.
fn chart_xml(
    chart_type: ChartType,
    data: &ChartData,
    colors: &[String],
    text_color: &str,
) -> String {
    let color_at = |i: usize| colors.get(i % colors.len().max(1)).map_or("4472C4", String::as_str);
    let mut categories = format!("<c:cat><c:strLit><c:ptCount val=\"{}\"/>", data.labels.len());
    for (i, label) in data.labels.iter().enumerate() {
        let _ = write!(categories, "<c:pt idx=\"{}\"><c:v>{}</c:v></c:pt>", i, escape(label));
    }
    categories.push_str("</c:strLit></c:cat>");

    let mut series = String::new();
    for (i, dataset) in data.datasets.iter().enumerate() {
        let _ = write!(
            series,
            "<c:ser><c:idx val=\"{i}\"/><c:order val=\"{i}\"/><c:tx><c:v>{}</c:v></c:tx>",
            escape(&dataset.name)
        );
        match chart_type {
            ChartType::Line => {
                let _ = write!(
                    series,
                    "<c:spPr><a:ln w=\"28575\">{}</a:ln></c:spPr><c:marker><c:symbol val=\"circle\"/></c:marker>",
                    solid_fill(color_at(i))
                );
            }
            ChartType::Pie => {
                for point in 0..dataset.values.len() {
                    let _ = write!(
                        series,
                        "<c:dPt><c:idx val=\"{}\"/><c:bubble3D val=\"0\"/><c:spPr>{}</c:spPr></c:dPt>",
                        point,
                        solid_fill(color_at(point))
                    );
                }
            }
            ChartType::Bar | ChartType::Area => {
                let _ = write!(series, "<c:spPr>{}</c:spPr>", solid_fill(color_at(i)));
            }
        }
        series.push_str(&categories);
        let _ = write!(series, "<c:val><c:numLit><c:ptCount val=\"{}\"/>", dataset.values.len());
        for (p, value) in dataset.values.iter().enumerate() {
            let _ = write!(series, "<c:pt idx=\"{}\"><c:v>{}</c:v></c:pt>", p, value);
        }
        series.push_str("</c:numLit></c:val>");
        if chart_type == ChartType::Line {
            series.push_str("<c:smooth val=\"0\"/>");
        }
        series.push_str("</c:ser>");
    }

    let axes_ids = "<c:axId val=\"111111111\"/><c:axId val=\"222222222\"/>";
    let plot = match chart_type {
        ChartType::Bar => format!(
            "<c:barChart><c:barDir val=\"col\"/><c:grouping val=\"clustered\"/><c:varyColors val=\"0\"/>{series}<c:gapWidth val=\"150\"/>{axes_ids}</c:barChart>"
        ),
        ChartType::Line => format!(
            "<c:lineChart><c:grouping val=\"standard\"/><c:varyColors val=\"0\"/>{series}<c:marker val=\"1\"/>{axes_ids}</c:lineChart>"
        ),
        ChartType::Area => format!(
            "<c:areaChart><c:grouping val=\"standard\"/><c:varyColors val=\"0\"/>{series}{axes_ids}</c:areaChart>"
        ),
        ChartType::Pie => {
            format!("<c:pieChart><c:varyColors val=\"1\"/>{series}<c:firstSliceAng val=\"0\"/></c:pieChart>")
        }
    };
    let text_props = format!(
        "<c:txPr><a:bodyPr/><a:lstStyle/><a:p><a:pPr><a:defRPr sz=\"1200\">{}</a:defRPr></a:pPr><a:endParaRPr lang=\"en-US\"/></a:p></c:txPr>",
        solid_fill(text_color)
    );
    let axes = if chart_type == ChartType::Pie {
        String::new()
    } else {
        format!(
            "<c:catAx><c:axId val=\"111111111\"/><c:scaling><c:orientation val=\"minMax\"/></c:scaling><c:delete val=\"0\"/><c:axPos val=\"b\"/><c:numFmt formatCode=\"General\" sourceLinked=\"0\"/><c:tickLblPos val=\"nextTo\"/>{text_props}<c:crossAx val=\"222222222\"/><c:crosses val=\"autoZero\"/><c:auto val=\"1\"/><c:lblAlgn val=\"ctr\"/><c:lblOffset val=\"100\"/></c:catAx>\
<c:valAx><c:axId val=\"222222222\"/><c:scaling><c:orientation val=\"minMax\"/></c:scaling><c:delete val=\"0\"/><c:axPos val=\"l\"/><c:majorGridlines/><c:numFmt formatCode=\"General\" sourceLinked=\"0\"/><c:tickLblPos val=\"nextTo\"/>{text_props}<c:crossAx val=\"111111111\"/><c:crosses val=\"autoZero\"/><c:crossBetween val=\"between\"/></c:valAx>"
        )
    };
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<c:chartSpace xmlns:c="{NS_CHART}" xmlns:a="{NS_DRAWING}" xmlns:r="{NS_RELATIONSHIPS}">
  <c:roundedCorners val="0"/>
  <c:chart>
    <c:autoTitleDeleted val="1"/>
    <c:plotArea><c:layout/>{plot}{axes}</c:plotArea>
    <c:legend><c:legendPos val="b"/><c:overlay val="0"/>{text_props}</c:legend>
    <c:plotVisOnly val="1"/>
  </c:chart>
</c:chartSpace>"#
    )
}

/// Format a time as a W3C date-time in UTC (`YYYY-MM-DDTHH:MM:SSZ`).
fn w3c_timestamp(time: SystemTime) -> String {
    let secs = time.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs()) as i64;
    let days = secs.div_euclid(86_400);
    let rem = secs.rem_euclid(86_400);
    // Civil date from days since 1970-01-01 (proleptic Gregorian).
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        year,
        month,
        day,
        rem / 3_600,
        rem % 3_600 / 60,
        rem % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use slidemark_core::chart::transform;
    use std::io::Read;
    use std::time::Duration;
    use zip::ZipArchive;

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        content
    }

    fn part_names(bytes: &[u8]) -> Vec<String> {
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        archive.file_names().map(str::to_string).collect()
    }

    fn text_slide(text: &str) -> SlideCanvas {
        let mut canvas = SlideCanvas::new("FFFFFF");
        let paragraph = Paragraph::new(vec![TextRun::plain(text)], 18.0, "1F2937");
        canvas.push(DrawCall::Text(TextBox::new(Rect::new(0, 0, 1000, 1000), vec![paragraph])));
        canvas
    }

    #[test]
    fn test_generate_minimal_package() {
        let theme = Theme::default();
        let mut writer = PptxWriter::new(&theme).with_title("Deck & Co");
        writer.add_slides([text_slide("Hello"), text_slide("World")]);
        let bytes = writer.generate().unwrap();

        let names = part_names(&bytes);
        for required in [
            "[Content_Types].xml",
            "_rels/.rels",
            "docProps/app.xml",
            "docProps/core.xml",
            "ppt/presentation.xml",
            "ppt/_rels/presentation.xml.rels",
            "ppt/slideMasters/slideMaster1.xml",
            "ppt/slideLayouts/slideLayout1.xml",
            "ppt/theme/theme1.xml",
            "ppt/slides/slide1.xml",
            "ppt/slides/slide2.xml",
            "ppt/slides/_rels/slide2.xml.rels",
        ] {
            assert!(names.iter().any(|n| n == required), "missing {}", required);
        }

        let presentation = read_part(&bytes, "ppt/presentation.xml");
        assert!(presentation.contains("cx=\"12192000\" cy=\"6858000\""));
        assert_eq!(presentation.matches("<p:sldId ").count(), 2);
        assert!(read_part(&bytes, "ppt/slides/slide1.xml").contains("<a:t>Hello</a:t>"));
        assert!(read_part(&bytes, "docProps/core.xml").contains("Deck &amp; Co"));
        let types = read_part(&bytes, "[Content_Types].xml");
        assert!(types.contains("/ppt/slides/slide2.xml"));
        assert!(!types.contains("notesSlide1"));
    }

    #[test]
    fn test_notes_slides_are_written() {
        let theme = Theme::default();
        let mut slide = text_slide("Body");
        slide.notes = Some("First point\n\nSecond <point>".to_string());
        let mut writer = PptxWriter::new(&theme);
        writer.add_slide(slide);
        writer.add_slide(text_slide("No notes"));
        let bytes = writer.generate().unwrap();

        let notes = read_part(&bytes, "ppt/notesSlides/notesSlide1.xml");
        assert!(notes.contains("First point"));
        assert!(notes.contains("Second &lt;point&gt;"));
        assert!(read_part(&bytes, "ppt/slides/_rels/slide1.xml.rels").contains("notesSlide1.xml"));
        assert!(!part_names(&bytes).iter().any(|n| n.contains("notesSlide2")));
        assert!(read_part(&bytes, "[Content_Types].xml")
            .contains("/ppt/notesSlides/notesSlide1.xml"));
    }

    #[test]
    fn test_images_and_charts_get_parts() {
        let theme = Theme::default();
        let mut canvas = SlideCanvas::new("000000");
        canvas.push(DrawCall::Image {
            rect: Rect::new(0, 0, 100, 100),
            data: vec![1, 2, 3],
            extension: "png".to_string(),
            description: "Logo".to_string(),
        });
        let rows = vec![
            vec!["Month".to_string(), "Sales".to_string(), "Cost".to_string()],
            vec!["Jan".to_string(), "100".to_string(), "40".to_string()],
        ];
        canvas.push(DrawCall::Chart {
            rect: Rect::new(0, 200, 500, 300),
            chart_type: ChartType::Line,
            data: transform(&rows),
            colors: vec!["FF0000".to_string()],
            text_color: "FFFFFF".to_string(),
        });
        let mut writer = PptxWriter::new(&theme);
        writer.add_slide(canvas);
        let bytes = writer.generate().unwrap();

        assert!(part_names(&bytes).iter().any(|n| n == "ppt/media/image1.png"));
        let chart = read_part(&bytes, "ppt/charts/chart1.xml");
        assert!(chart.contains("<c:lineChart>"));
        assert!(chart.contains("<c:v>Sales</c:v>"));
        assert!(chart.contains("<c:v>Cost</c:v>"));
        assert!(chart.contains("<c:v>100</c:v>"));
        let rels = read_part(&bytes, "ppt/slides/_rels/slide1.xml.rels");
        assert!(rels.contains("../media/image1.png"));
        assert!(rels.contains("../charts/chart1.xml"));
        let types = read_part(&bytes, "[Content_Types].xml");
        assert!(types.contains("Extension=\"png\""));
        assert!(types.contains("/ppt/charts/chart1.xml"));
        let slide = read_part(&bytes, "ppt/slides/slide1.xml");
        assert!(slide.contains("<a:srgbClr val=\"000000\"/>"));
    }

    #[test]
    fn test_pie_chart_has_no_axes() {
        let rows = vec![
            vec!["Part".to_string(), "Share".to_string()],
            vec!["A".to_string(), "60".to_string()],
            vec!["B".to_string(), "40".to_string()],
        ];
        let colors = ["111111".to_string(), "222222".to_string()];
        let xml = chart_xml(ChartType::Pie, &transform(&rows), &colors, "000000");
        assert!(xml.contains("<c:pieChart>"));
        assert!(!xml.contains("<c:catAx>"));
        assert_eq!(xml.matches("<c:dPt>").count(), 2);
    }

    #[test]
    fn test_links_add_external_relationships() {
        let mut rels = RelationshipTable::default();
        rels.add(REL_SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml");
        let run = TextRun {
            link: Some("https://example.com/?a=1&b=2".to_string()),
            ..TextRun::plain("site")
        };
        let paragraph = Paragraph::new(vec![run], 18.0, "000000");
        let xml = paragraph_xml(&paragraph, &mut rels);
        assert!(xml.contains("<a:hlinkClick r:id=\"rId2\"/>"));
        let rels_xml = String::from_utf8(rels.to_xml().unwrap()).unwrap();
        assert!(rels_xml.contains("TargetMode=\"External\""));
        assert!(rels_xml.contains("a=1&amp;b=2"));
    }

    #[test]
    fn test_shape_alpha_and_bullets() {
        let xml = shape_xml(5, Rect::new(0, 0, 10, 10), ShapeKind::Ellipse, "ABCDEF", 0.5, 2000);
        assert!(xml.contains("prst=\"ellipse\""));
        assert!(xml.contains("<a:alpha val=\"50000\"/>"));
        assert!(xml.contains("<a:softEdge rad=\"2000\"/>"));

        let mut rels = RelationshipTable::default();
        let mut item = Paragraph::new(vec![TextRun::plain("x")], 20.0, "000000");
        item.bullet = Some(Bullet::Number { start: 3 });
        item.level = 1;
        let xml = paragraph_xml(&item, &mut rels);
        assert!(xml.contains("startAt=\"3\""));
        assert!(xml.contains("lvl=\"1\""));
    }

    #[test]
    fn test_w3c_timestamp() {
        assert_eq!(w3c_timestamp(UNIX_EPOCH), "1970-01-01T00:00:00Z");
        let leap_day = UNIX_EPOCH + Duration::from_secs(951_782_400 + 3_661);
        assert_eq!(w3c_timestamp(leap_day), "2000-02-29T01:01:01Z");
    }
}
