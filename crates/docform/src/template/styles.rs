//! The fixed house style applied to every output document.

/// Twentieths of a point per inch.
pub const TWIPS_PER_INCH: u32 = 1440;

pub fn pt_to_twips(pt: u32) -> u32 {
    pt * 20
}

pub fn pt_to_half_points(pt: u32) -> u32 {
    pt * 2
}

pub fn mm_to_twips(mm: u32) -> u32 {
    // 1 mm = 1440 / 25.4 twips, rounded to the nearest twip.
    (mm * TWIPS_PER_INCH * 10 + 127) / 254
}

/// How a paragraph is styled in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphRole {
    Heading,
    Subheading,
    Body,
}

impl ParagraphRole {
    /// Style id written to `styles.xml` for this role.
    pub fn style_id(&self) -> &'static str {
        match self {
            ParagraphRole::Heading => "Heading1",
            ParagraphRole::Subheading => "Heading2",
            ParagraphRole::Body => "Normal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStyle {
    pub size_pt: u32,
    pub bold: bool,
    pub space_after_pt: u32,
    pub keep_with_next: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSetup {
    pub width_mm: u32,
    pub height_mm: u32,
    pub margin_twips: u32,
    pub header_distance_twips: u32,
    pub footer_distance_twips: u32,
}

impl PageSetup {
    pub fn width_twips(&self) -> u32 {
        mm_to_twips(self.width_mm)
    }

    pub fn height_twips(&self) -> u32 {
        mm_to_twips(self.height_mm)
    }

    /// Width available between the left and right margins.
    pub fn text_width_twips(&self) -> u32 {
        self.width_twips().saturating_sub(2 * self.margin_twips)
    }

    pub fn text_height_twips(&self) -> u32 {
        self.height_twips().saturating_sub(2 * self.margin_twips)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStyle {
    pub font_size_pt: u32,
    pub cell_spacing_pt: u32,
    pub inner_border_size: u32,
    pub outer_border_size: u32,
    /// Space after the empty paragraphs around each table.
    pub spacer_after_pt: u32,
}

/// Pictures are centered on their own line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageStyle {
    /// Widest a picture is drawn; the text area still bounds it.
    pub max_width_twips: u32,
    /// Screen resolution used for a picture's natural size.
    pub pixels_per_inch: u32,
    pub space_after_pt: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateStyle {
    pub font_family: String,
    pub color: String,
    pub page: PageSetup,
    pub heading: TextStyle,
    pub subheading: TextStyle,
    pub body: TextStyle,
    pub table: TableStyle,
    pub image: ImageStyle,
    pub footer_size_pt: u32,
}

impl TemplateStyle {
    pub fn text_style(&self, role: ParagraphRole) -> &TextStyle {
        match role {
            ParagraphRole::Heading => &self.heading,
            ParagraphRole::Subheading => &self.subheading,
            ParagraphRole::Body => &self.body,
        }
    }
}

impl Default for TemplateStyle {
    fn default() -> Self {
        Self {
            font_family: "Calibri".to_string(),
            color: "000000".to_string(),
            page: PageSetup {
                width_mm: 210,
                height_mm: 297,
                margin_twips: TWIPS_PER_INCH,
                header_distance_twips: TWIPS_PER_INCH / 2,
                footer_distance_twips: TWIPS_PER_INCH / 2,
            },
            heading: TextStyle {
                size_pt: 14,
                bold: true,
                space_after_pt: 18,
                keep_with_next: true,
            },
            subheading: TextStyle {
                size_pt: 13,
                bold: true,
                space_after_pt: 14,
                keep_with_next: true,
            },
            body: TextStyle {
                size_pt: 12,
                bold: false,
                space_after_pt: 12,
                keep_with_next: false,
            },
            table: TableStyle {
                font_size_pt: 11,
                cell_spacing_pt: 3,
                inner_border_size: 4,
                outer_border_size: 6,
                spacer_after_pt: 6,
            },
            image: ImageStyle {
                max_width_twips: 6 * TWIPS_PER_INCH,
                pixels_per_inch: 96,
                space_after_pt: 12,
            },
            footer_size_pt: 10,
        }
    }
}
