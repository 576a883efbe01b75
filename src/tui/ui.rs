//! UI rendering for the debugger.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, List, ListItem},
    style::{Color, Style, Modifier},
};
use crate::bits;
use crate::cpu::{MEMORY_SIZE, Phase};
use super::app::DebuggerApp;

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(55),
            Constraint::Percentage(45),
        ])
        .split(frame.area());

    // Left side: memory and status
    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(MEMORY_SIZE as u16 + 2),
            Constraint::Min(3),
        ])
        .split(chunks[0]);

    draw_memory(frame, left_chunks[0], app);
    draw_status(frame, left_chunks[1], app);

    // Right side: registers, cycle and help
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(9),
            Constraint::Length(5),
            Constraint::Min(10),
            Constraint::Length(5),
        ])
        .split(chunks[1]);

    draw_registers(frame, right_chunks[0], app);
    draw_cycle(frame, right_chunks[1], app);
    draw_opcodes(frame, right_chunks[2], app);
    draw_help(frame, right_chunks[3]);
}

/// Draw memory: one row per cell, with its disassembly.
fn draw_memory(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let items: Vec<ListItem> = app
        .get_disassembly()
        .into_iter()
        .map(|(addr, instr, is_current)| {
            let value = app.cpu.read_memory(addr as usize).unwrap_or_default();
            let prefix = if is_current { "▶" } else { " " };
            let bp = if app.breakpoints.contains(&addr) { "●" } else { " " };
            let text = format!(
                "{}{} {:02}: {} = {:>3}  {}",
                bp, prefix, addr, bits::format_byte(value), value, instr
            );

            let is_target = app.load_panel.is_some_and(|p| p.addr == addr);
            let style = if is_target {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else if is_current {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if app.breakpoints.contains(&addr) {
                Style::default().fg(Color::Red)
            } else if value != 0 {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };

            ListItem::new(text).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Memory ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)));

    frame.render_widget(list, area);
}

/// Draw register state.
fn draw_registers(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let regs = &app.cpu.regs;

    let content = vec![
        Line::from(vec![
            Span::raw("A:   "),
            Span::styled(bits::format_byte(regs.a), Style::default().fg(Color::White)),
            Span::raw(format!(" = {:>3} ({:>4})", regs.a, regs.a as i8)),
        ]),
        Line::from(vec![
            Span::raw("B:   "),
            Span::styled(bits::format_byte(regs.b), Style::default().fg(Color::White)),
            Span::raw(format!(" = {:>3} ({:>4})", regs.b, regs.b as i8)),
        ]),
        Line::from(vec![
            Span::raw("IAR: "),
            Span::styled(bits::format_nibble(regs.iar), Style::default().fg(Color::Yellow)),
            Span::raw(format!(" = {}", regs.iar.value())),
        ]),
        Line::from(vec![
            Span::raw("IR:  "),
            Span::styled(bits::format_nibble(regs.ir.opcode), Style::default().fg(Color::Cyan)),
            Span::raw(" "),
            Span::styled(bits::format_nibble(regs.ir.operand), Style::default().fg(Color::White)),
        ]),
        Line::from(vec![
            Span::raw("Z: "),
            Span::styled(flag_text(regs.flags.z), flag_style(regs.flags.z)),
            Span::raw("  N: "),
            Span::styled(flag_text(regs.flags.n), flag_style(regs.flags.n)),
            Span::raw("  O: "),
            Span::styled(flag_text(regs.flags.o), flag_style(regs.flags.o)),
        ]),
        Line::from(vec![
            Span::raw("Cycles: "),
            Span::styled(format!("{}", app.cpu.cycles), Style::default().fg(Color::Cyan)),
            Span::raw("   State: "),
            Span::styled(format!("{:?}", app.cpu.state),
                if app.cpu.is_running() {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default().fg(Color::Red)
                }),
        ]),
    ];

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title(" Registers ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)));

    frame.render_widget(paragraph, area);
}

/// Draw the instruction cycle, highlighting the phase that runs next.
fn draw_cycle(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let next = app.cpu.phase();
    let phases = [
        (Phase::Fetch, "FETCH"),
        (Phase::Decode, "DECODE"),
        (Phase::Execute, "EXECUTE"),
        (Phase::Increment, "INCREMENT"),
    ];

    let mut spans = Vec::new();
    for (i, (phase, name)) in phases.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" → "));
        }
        let style = if *phase == next && app.cpu.is_running() {
            Style::default().fg(Color::Black).bg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(*name, style));
    }

    let pending = match app.cpu.pending() {
        Some(d) => match d.operand() {
            Some(operand) => format!("Decoded: {} {}", d.mnemonic(), operand),
            None => format!("Decoded: {}", d.mnemonic()),
        },
        None => "Decoded: -".to_string(),
    };
    let jump = if app.cpu.jump_pending() { "Jump taken: IAR will not advance" } else { "" };

    let paragraph = Paragraph::new(vec![
        Line::from(spans),
        Line::from(pending),
        Line::from(jump),
    ])
    .block(Block::default()
        .title(" Cycle ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan)));

    frame.render_widget(paragraph, area);
}

/// Draw the opcode table. With the load panel open, the chosen row is
/// highlighted and the byte about to be written is shown in the title.
fn draw_opcodes(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let selected = app.load_panel.map(|p| p.entry);

    let items: Vec<ListItem> = app
        .opcodes()
        .iter()
        .enumerate()
        .map(|(i, info)| {
            let text = format!("{:04b} {:<9} {}", info.opcode, info.mnemonic.name(), info.description);
            let style = if selected == Some(i) {
                Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            ListItem::new(text).style(style)
        })
        .collect();

    let title = match (app.load_panel, app.load_panel_byte()) {
        (Some(panel), Some(raw)) => format!(
            " Load RAM[{}] <- {} (operand {}) ",
            panel.addr, bits::format_byte(raw), panel.operand
        ),
        _ => " Opcodes (e: load instruction) ".to_string(),
    };

    let list = List::new(items)
        .block(Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)));

    frame.render_widget(list, area);
}

/// Draw status bar.
fn draw_status(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let status = Paragraph::new(app.status.clone())
        .style(Style::default().fg(Color::White))
        .block(Block::default()
            .title(" Status ")
            .borders(Borders::ALL));

    frame.render_widget(status, area);
}

/// Draw help panel.
fn draw_help(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(vec![
        Line::from("n: Next phase  s: Step  r: Run  p: Pause"),
        Line::from("b: Breakpoint  x: Reset  X: Full reset"),
        Line::from("l: Reload  e: Load instruction  q: Quit"),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default()
        .title(" Help ")
        .borders(Borders::ALL));

    frame.render_widget(help, area);
}

fn flag_text(set: bool) -> &'static str {
    if set { "T" } else { "F" }
}

fn flag_style(set: bool) -> Style {
    if set {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Gray)
    }
}
